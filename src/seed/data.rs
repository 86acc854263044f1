use anyhow::{Context, Result};
use uuid::Uuid;

use crate::logic::AssociationWriter;
use crate::model::{
    CreateManyAlbumPictures, CreateManyPictureTags, Picture, PictureAlbum, PokemonTrainer,
    RecordId,
};
use crate::store::traits::{RecordStore, Store};

/// Load the demo catalog: a handful of pictures, two albums with their
/// pictures, a few tags and the Kanto trainers.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    let pictures = load_pictures(store).await?;
    load_albums(store, &pictures).await?;
    load_tags(store, &pictures).await?;
    load_trainers(store).await?;

    log::info!("Seed data loaded: {} pictures", pictures.len());
    Ok(())
}

async fn load_pictures<S: Store>(store: &S) -> Result<Vec<Picture>> {
    let pictures = vec![
        Picture::new("Sunset")
            .with_description("Sunset over Casper Mountain")
            .with_blob_id(Uuid::new_v4()),
        Picture::new("Elephants")
            .with_description("Herd crossing the Chobe river")
            .with_blob_id(Uuid::new_v4()),
        Picture::new("Mountains").with_blob_id(Uuid::new_v4()),
        Picture::new("Lighthouse").with_description("Split Rock at dusk"),
        Picture::new("Prairie"),
    ];

    RecordStore::<Picture>::insert_many(store, pictures)
        .await
        .context("Failed to seed pictures")
}

/// Ids of the seeded pictures with the given names, in the order named.
/// Names that were not seeded are skipped.
fn picture_ids(pictures: &[Picture], names: &[&str]) -> Vec<RecordId> {
    names
        .iter()
        .filter_map(|name| pictures.iter().find(|p| p.name == *name))
        .map(|p| p.picture_id)
        .collect()
}

async fn load_albums<S: Store>(store: &S, pictures: &[Picture]) -> Result<()> {
    let writer = AssociationWriter::default();

    let wyoming = RecordStore::<PictureAlbum>::insert(store, PictureAlbum::new("Wyoming"))
        .await
        .context("Failed to seed album 'Wyoming'")?;
    let safari = RecordStore::<PictureAlbum>::insert(store, PictureAlbum::new("Safari"))
        .await
        .context("Failed to seed album 'Safari'")?;

    let memberships = [
        (
            wyoming.picture_album_id,
            picture_ids(pictures, &["Sunset", "Mountains", "Prairie"]),
        ),
        (safari.picture_album_id, picture_ids(pictures, &["Elephants"])),
    ];
    for (picture_album_id, picture_ids) in memberships {
        if picture_ids.is_empty() {
            continue;
        }
        let request = CreateManyAlbumPictures {
            picture_album_id,
            picture_ids,
        };
        writer
            .create_many(store, request)
            .await
            .with_context(|| format!("Failed to seed pictures for album {}", picture_album_id))?;
    }
    Ok(())
}

async fn load_tags<S: Store>(store: &S, pictures: &[Picture]) -> Result<()> {
    let writer = AssociationWriter::default();
    let Some(sunset) = pictures.iter().find(|p| p.name == "Sunset") else {
        return Ok(());
    };

    let request = CreateManyPictureTags {
        picture_id: sunset.picture_id,
        tags: vec![
            "Casper, Wyoming".to_string(),
            "Laramie, Wyoming".to_string(),
            "Cheyenne, Wyoming".to_string(),
        ],
    };
    writer
        .create_many(store, request)
        .await
        .context("Failed to seed picture tags")?;
    Ok(())
}

async fn load_trainers<S: Store>(store: &S) -> Result<()> {
    let trainers = vec![
        PokemonTrainer::new("Ash", 8),
        PokemonTrainer::new("Misty", 2),
        PokemonTrainer::new("Brock", 1),
    ];

    RecordStore::<PokemonTrainer>::insert_many(store, trainers)
        .await
        .context("Failed to seed trainers")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PictureAlbumPicture, PictureTag};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_seed_populates_every_resource() {
        let store = MemoryStore::new();
        load_seed_data(&store).await.unwrap();

        let pictures: Vec<Picture> = store.find_all().await.unwrap();
        assert_eq!(pictures.len(), 5);

        let albums: Vec<PictureAlbum> = store.find_all().await.unwrap();
        assert_eq!(albums.len(), 2);

        let links: Vec<PictureAlbumPicture> = store.find_all().await.unwrap();
        assert_eq!(links.len(), 4);

        let tags: Vec<PictureTag> = store.find_all().await.unwrap();
        assert!(tags.iter().all(|t| t.picture_id == 1));
        assert_eq!(tags.len(), 3);

        let trainers: Vec<PokemonTrainer> = store.find_all().await.unwrap();
        assert_eq!(trainers[0].name, "Ash");

        assert_eq!(pictures.iter().filter(|p| p.blob_id.is_some()).count(), 3);
    }

    #[test]
    fn test_picture_ids_skips_unknown_names() {
        let mut sunset = Picture::new("Sunset");
        sunset.picture_id = 4;
        let mut prairie = Picture::new("Prairie");
        prairie.picture_id = 9;

        let pictures = vec![sunset, prairie];
        assert_eq!(
            picture_ids(&pictures, &["Prairie", "Lighthouse", "Sunset"]),
            vec![9, 4]
        );
        assert!(picture_ids(&[], &["Sunset"]).is_empty());
    }
}
