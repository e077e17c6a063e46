//! Container images and the repositories that tag them.

use std::collections::BTreeMap;
use std::sync::Arc;

use regis_registry::{DiagnosticSink, Registry, RegistryResult, WatchStream};
use regis_store::KeyValueStore;
use regis_types::{LabelSelector, ObjectMeta, Resource};
use serde::{Deserialize, Serialize};

/// Metadata reported by the image registry for a pushed image.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerImageMetadata {
    /// Content-addressed image id.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    #[serde(default)]
    pub size: u64,
}

/// An immutable container image. Images are never updated in place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub metadata: ObjectMeta,

    /// Pull reference of the image, e.g. `registry:5000/ns/app@sha256:...`.
    pub docker_image_reference: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image_metadata: Option<DockerImageMetadata>,
}

impl Image {
    pub fn new(id: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(id),
            docker_image_reference: reference.into(),
            docker_image_metadata: None,
        }
    }
}

impl Resource for Image {
    const KIND: &'static str = "Image";
    const NAME: &'static str = "image";
    const PREFIX: &'static str = "/images";
    const UPDATABLE: bool = false;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRepositoryStatus {
    /// Where the repository can actually be pulled from, once known.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_image_repository: String,
}

/// A named set of tags, each pointing at an image id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRepository {
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_image_repository: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub status: ImageRepositoryStatus,
}

impl ImageRepository {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(id),
            ..Default::default()
        }
    }

    /// Point `tag` at `image_id`, returning the image it pointed at before.
    pub fn tag(&mut self, tag: impl Into<String>, image_id: impl Into<String>) -> Option<String> {
        self.tags.insert(tag.into(), image_id.into())
    }

    pub fn resolve(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }
}

impl Resource for ImageRepository {
    const KIND: &'static str = "ImageRepository";
    const NAME: &'static str = "imageRepository";
    const PREFIX: &'static str = "/imageRepositories";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Registries for images and image repositories over one store.
pub struct ImageRegistry<S: ?Sized> {
    images: Registry<Image, S>,
    image_repositories: Registry<ImageRepository, S>,
}

impl<S: ?Sized> Clone for ImageRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            images: self.images.clone(),
            image_repositories: self.image_repositories.clone(),
        }
    }
}

impl<S: KeyValueStore + ?Sized> ImageRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            images: Registry::new(Arc::clone(&store)),
            image_repositories: Registry::new(store),
        }
    }

    pub fn with_diagnostics(store: Arc<S>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            images: Registry::with_diagnostics(Arc::clone(&store), Arc::clone(&sink)),
            image_repositories: Registry::with_diagnostics(store, sink),
        }
    }

    pub fn images(&self) -> &Registry<Image, S> {
        &self.images
    }

    pub fn image_repositories(&self) -> &Registry<ImageRepository, S> {
        &self.image_repositories
    }

    pub fn list_images<L: LabelSelector + ?Sized>(&self, selector: &L) -> RegistryResult<Vec<Image>> {
        self.images.list(selector)
    }

    pub fn get_image(&self, id: &str) -> RegistryResult<Image> {
        self.images.get(id)
    }

    pub fn create_image(&self, image: &Image) -> RegistryResult<Image> {
        self.images.create(image)
    }

    /// Always fails with `Unsupported`: images are immutable.
    pub fn update_image(&self, image: &Image) -> RegistryResult<Image> {
        self.images.update(image)
    }

    pub fn delete_image(&self, id: &str) -> RegistryResult<()> {
        self.images.delete(id)
    }

    pub fn watch_images<F>(
        &self,
        resource_version: &str,
        predicate: F,
    ) -> RegistryResult<WatchStream<Image>>
    where
        F: Fn(&Image) -> bool + Send + Sync + 'static,
    {
        self.images.watch(resource_version, predicate)
    }

    pub fn list_image_repositories<L: LabelSelector + ?Sized>(
        &self,
        selector: &L,
    ) -> RegistryResult<Vec<ImageRepository>> {
        self.image_repositories.list(selector)
    }

    pub fn get_image_repository(&self, id: &str) -> RegistryResult<ImageRepository> {
        self.image_repositories.get(id)
    }

    pub fn create_image_repository(
        &self,
        repository: &ImageRepository,
    ) -> RegistryResult<ImageRepository> {
        self.image_repositories.create(repository)
    }

    pub fn update_image_repository(
        &self,
        repository: &ImageRepository,
    ) -> RegistryResult<ImageRepository> {
        self.image_repositories.update(repository)
    }

    pub fn delete_image_repository(&self, id: &str) -> RegistryResult<()> {
        self.image_repositories.delete(id)
    }

    pub fn watch_image_repositories<F>(
        &self,
        resource_version: &str,
        predicate: F,
    ) -> RegistryResult<WatchStream<ImageRepository>>
    where
        F: Fn(&ImageRepository) -> bool + Send + Sync + 'static,
    {
        self.image_repositories.watch(resource_version, predicate)
    }
}
