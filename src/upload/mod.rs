//! Multipart image uploads.
//!
//! A multipart body carries a `data` field with the JSON payload and any number of image
//! fields. Each image is compressed and written under the upload root as
//! `<directory>/<uuid>.jpg`; the relative path is what gets stored in the database and
//! served under `/uploads`.

pub mod image;

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::UploadSettings;
use crate::error::AppError;

/// Name of the multipart field holding the JSON payload.
pub const DATA_FIELD: &str = "data";

/// Recognised file fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadField {
    Logo,
    CollectionImage,
    ProductImage,
    ProfileImage,
    StoreImage,
    SliderImage,
    MetaImage,
    /// `variationImages[i]` or `variationImages_i`: an image of the i-th submitted variation.
    VariationImage(usize),
}

impl UploadField {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "logo" => UploadField::Logo,
            "collectionImage" => UploadField::CollectionImage,
            "productImage" => UploadField::ProductImage,
            "profileImage" => UploadField::ProfileImage,
            "storeImage" => UploadField::StoreImage,
            "sliderImage" => UploadField::SliderImage,
            "metaImage" => UploadField::MetaImage,
            other => {
                let rest = other.strip_prefix("variationImages")?;
                let index = rest
                    .strip_prefix('[')
                    .and_then(|r| r.strip_suffix(']'))
                    .or_else(|| rest.strip_prefix('_'))?;
                UploadField::VariationImage(index.parse().ok()?)
            }
        })
    }

    /// Whether a request may carry several files under this field.
    pub fn is_repeatable(&self) -> bool {
        matches!(self, UploadField::ProductImage | UploadField::VariationImage(_))
    }

    /// Same field kind. Variation images match whatever their index.
    pub fn same_kind(&self, other: &UploadField) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Directory under the upload root.
    pub fn directory(&self) -> &'static str {
        match self {
            UploadField::Logo => "logos",
            UploadField::CollectionImage => "collections",
            UploadField::ProductImage => "products",
            UploadField::ProfileImage => "profiles",
            UploadField::StoreImage => "stores",
            UploadField::SliderImage => "sliders",
            UploadField::MetaImage => "seo",
            UploadField::VariationImage(_) => "products/variations",
        }
    }
}

/// Compressed image storage on the local filesystem.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_dimension: u32,
    quality: u8,
    max_file_bytes: usize,
}

impl ImageStore {
    pub fn new(settings: &UploadSettings) -> Self {
        ImageStore {
            root: settings.dir.clone(),
            max_dimension: settings.max_dimension,
            quality: settings.quality,
            max_file_bytes: settings.max_file_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compresses `data` and writes it under `directory`. Returns the relative path.
    pub async fn save(&self, directory: &str, data: Vec<u8>) -> Result<String, AppError> {
        if data.is_empty() {
            return Err(AppError::Validation("empty file".into()));
        }
        if data.len() > self.max_file_bytes {
            return Err(AppError::Validation(format!(
                "file too large, maximum is {} bytes",
                self.max_file_bytes
            )));
        }
        let (max_dimension, quality) = (self.max_dimension, self.quality);
        let jpeg = tokio::task::spawn_blocking(move || image::compress(&data, max_dimension, quality))
            .await
            .map_err(|e| AppError::Internal(format!("image task: {}", e)))??;

        let relative = format!("{}/{}.jpg", directory, Uuid::new_v4());
        let full = self.root.join(&relative);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, jpeg).await?;
        tracing::debug!(path = %relative, "stored image");
        Ok(relative)
    }

    /// Absolute path for a stored relative path. Anything escaping the root is refused.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let rel = Path::new(relative.trim_start_matches('/'));
        let safe = rel.components().all(|c| matches!(c, Component::Normal(_)));
        (safe && rel.components().next().is_some()).then(|| self.root.join(rel))
    }

    pub async fn remove(&self, relative: &str) -> std::io::Result<()> {
        let path = self
            .resolve(relative)
            .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path outside upload root"))?;
        tokio::fs::remove_file(path).await
    }

    /// Best-effort delete: a missing file is logged at debug, other failures at warn.
    pub async fn remove_quietly(&self, relative: &str) {
        match self.remove(relative).await {
            Ok(()) => tracing::debug!(path = %relative, "removed image"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %relative, "image already gone")
            }
            Err(e) => tracing::warn!(path = %relative, error = %e, "failed to remove image"),
        }
    }

    pub async fn remove_all_quietly<I>(&self, paths: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for p in paths {
            self.remove_quietly(p.as_ref()).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedFile {
    pub field: UploadField,
    pub path: String,
}

/// Files written while reading one request.
#[derive(Debug)]
pub struct UploadedFiles {
    store: ImageStore,
    saved: Vec<SavedFile>,
}

impl UploadedFiles {
    pub fn new(store: ImageStore) -> Self {
        UploadedFiles { store, saved: Vec::new() }
    }

    /// First file sent under `field`.
    pub fn first(&self, field: UploadField) -> Option<String> {
        self.saved.iter().find(|f| f.field == field).map(|f| f.path.clone())
    }

    /// Groups variation images by index for `count` variations. An index past the end is rejected.
    pub fn variation_image_groups(&self, count: usize) -> Result<Vec<Vec<String>>, AppError> {
        let mut groups = vec![Vec::new(); count];
        for f in &self.saved {
            if let UploadField::VariationImage(i) = f.field {
                let group = groups.get_mut(i).ok_or_else(|| {
                    AppError::Validation(format!("variationImages[{}] has no matching variation", i))
                })?;
                group.push(f.path.clone());
            }
        }
        Ok(groups)
    }

    pub fn of(&self, field: UploadField) -> Vec<String> {
        self.saved
            .iter()
            .filter(|f| f.field == field)
            .map(|f| f.path.clone())
            .collect()
    }

    /// Deletes every file of this request. Used when the handler fails after saving.
    pub async fn discard(self) {
        let paths: Vec<String> = self.saved.into_iter().map(|f| f.path).collect();
        self.store.remove_all_quietly(paths).await;
    }

    /// Passes `result` through, discarding the files first when it is an error.
    pub async fn settle<T>(self, result: Result<T, AppError>) -> Result<T, AppError> {
        if result.is_err() {
            self.discard().await;
        }
        result
    }
}

/// A parsed multipart request.
#[derive(Debug)]
pub struct MultipartForm {
    pub data: Map<String, Value>,
    pub files: UploadedFiles,
}

impl MultipartForm {
    /// Deserializes the `data` payload.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(self.data.clone()))
            .map_err(|e| AppError::Validation(format!("invalid payload: {}", e)))
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid multipart body: {}", e))
}

/// Reads the whole body, saving the image fields listed in `accepted`. Any other image field,
/// or a second file under a single-file field, is rejected. On error, files already written for
/// this request are removed.
pub async fn read_multipart(
    store: &ImageStore,
    mut multipart: Multipart,
    accepted: &[UploadField],
) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm {
        data: Map::new(),
        files: UploadedFiles::new(store.clone()),
    };
    match read_fields(store, &mut multipart, accepted, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.files.discard().await;
            Err(e)
        }
    }
}

async fn read_fields(
    store: &ImageStore,
    multipart: &mut Multipart,
    accepted: &[UploadField],
    form: &mut MultipartForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == DATA_FIELD {
            let text = field.text().await.map_err(multipart_error)?;
            if text.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => form.data = map,
                Ok(_) => return Err(AppError::Validation("data must be a JSON object".into())),
                Err(e) => return Err(AppError::Validation(format!("data is not valid JSON: {}", e))),
            }
            continue;
        }
        let Some(kind) = UploadField::parse(&name) else {
            tracing::debug!(field = %name, "ignoring unknown multipart field");
            continue;
        };
        check_field(&form.files, accepted, kind, &name)?;
        let is_image = field
            .content_type()
            .map(|ct| ct.to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(AppError::Validation(format!("{} must be an image", name)));
        }
        let bytes = field.bytes().await.map_err(multipart_error)?;
        let path = store.save(kind.directory(), bytes.to_vec()).await?;
        form.files.saved.push(SavedFile { field: kind, path });
    }
    Ok(())
}

fn check_field(files: &UploadedFiles, accepted: &[UploadField], kind: UploadField, name: &str) -> Result<(), AppError> {
    if !accepted.iter().any(|a| a.same_kind(&kind)) {
        return Err(AppError::Validation(format!("{} is not accepted here", name)));
    }
    if !kind.is_repeatable() && files.saved.iter().any(|f| f.field == kind) {
        return Err(AppError::Validation(format!("{} may only be sent once", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> ImageStore {
        ImageStore::new(&UploadSettings {
            dir: dir.to_path_buf(),
            ..UploadSettings::default()
        })
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(w, h, ::image::Rgb([1, 2, 3]));
        let mut out = Vec::new();
        ::image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), ::image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn parses_field_names() {
        assert_eq!(UploadField::parse("logo"), Some(UploadField::Logo));
        assert_eq!(UploadField::parse("variationImages[2]"), Some(UploadField::VariationImage(2)));
        assert_eq!(UploadField::parse("variationImages_0"), Some(UploadField::VariationImage(0)));
        assert_eq!(UploadField::parse("variationImages[x]"), None);
        assert_eq!(UploadField::parse("variationImages"), None);
        assert_eq!(UploadField::parse("avatar"), None);
    }

    #[test]
    fn maps_fields_to_directories() {
        assert_eq!(UploadField::StoreImage.directory(), "stores");
        assert_eq!(UploadField::MetaImage.directory(), "seo");
        assert_eq!(UploadField::VariationImage(4).directory(), "products/variations");
    }

    #[test]
    fn refuses_paths_outside_root() {
        let s = store(Path::new("/srv/uploads"));
        assert!(s.resolve("../etc/passwd").is_none());
        assert!(s.resolve("logos/../../x").is_none());
        assert!(s.resolve("").is_none());
        assert_eq!(s.resolve("logos/a.jpg"), Some(PathBuf::from("/srv/uploads/logos/a.jpg")));
        assert_eq!(s.resolve("/logos/a.jpg"), Some(PathBuf::from("/srv/uploads/logos/a.jpg")));
    }

    #[tokio::test]
    async fn saves_compressed_jpeg_and_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let rel = s.save("logos", png(20, 10)).await.unwrap();
        assert!(rel.starts_with("logos/") && rel.ends_with(".jpg"));
        let written = std::fs::read(dir.path().join(&rel)).unwrap();
        assert_eq!(::image::guess_format(&written).unwrap(), ::image::ImageFormat::Jpeg);

        s.remove_quietly(&rel).await;
        assert!(!dir.path().join(&rel).exists());
        s.remove_quietly(&rel).await;
    }

    #[tokio::test]
    async fn rejects_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let s = ImageStore::new(&UploadSettings {
            dir: dir.path().to_path_buf(),
            max_file_bytes: 4,
            ..UploadSettings::default()
        });
        let err = s.save("logos", vec![0u8; 5]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn groups_variation_images_by_index() {
        let mut files = UploadedFiles::new(store(Path::new("/tmp")));
        for (i, p) in [(1, "b.jpg"), (0, "a.jpg"), (1, "c.jpg")] {
            files.saved.push(SavedFile {
                field: UploadField::VariationImage(i),
                path: p.into(),
            });
        }
        files.saved.push(SavedFile {
            field: UploadField::Logo,
            path: "logo.jpg".into(),
        });
        let groups = files.variation_image_groups(3).unwrap();
        assert_eq!(groups, vec![vec!["a.jpg".to_string()], vec!["b.jpg".into(), "c.jpg".into()], vec![]]);
        assert!(matches!(files.variation_image_groups(1), Err(AppError::Validation(_))));
    }

    #[test]
    fn only_accepted_fields_are_stored() {
        let mut files = UploadedFiles::new(store(Path::new("/tmp")));
        let accepted = [UploadField::Logo, UploadField::VariationImage(0)];
        assert!(check_field(&files, &accepted, UploadField::Logo, "logo").is_ok());
        assert!(check_field(&files, &accepted, UploadField::VariationImage(3), "variationImages[3]").is_ok());
        assert!(matches!(
            check_field(&files, &accepted, UploadField::ProductImage, "productImage"),
            Err(AppError::Validation(_))
        ));

        files.saved.push(SavedFile {
            field: UploadField::Logo,
            path: "logos/a.jpg".into(),
        });
        assert!(matches!(
            check_field(&files, &accepted, UploadField::Logo, "logo"),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn discard_removes_every_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let rel = s.save("logos", png(4, 4)).await.unwrap();
        let mut files = UploadedFiles::new(s);
        files.saved.push(SavedFile {
            field: UploadField::Logo,
            path: rel.clone(),
        });
        let result: Result<(), AppError> = Err(AppError::Validation("x".into()));
        assert!(files.settle(result).await.is_err());
        assert!(!dir.path().join(&rel).exists());
    }
}
