//! Deployments and the configs they are rolled out from.

use std::sync::Arc;

use regis_registry::{DiagnosticSink, Registry, RegistryResult, WatchStream};
use regis_store::KeyValueStore;
use regis_types::{LabelSelector, Labels, ObjectMeta, Resource};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentStatus {
    #[default]
    New,
    Pending,
    Running,
    Complete,
    Failed,
}

impl DeploymentStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyType {
    /// Tear down the old replicas, then start the new ones.
    #[default]
    Recreate,
    /// Run a custom image that performs the rollout.
    CustomPod,
}

/// How a deployment is rolled out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStrategy {
    #[serde(rename = "type")]
    pub strategy_type: StrategyType,

    /// Image run by a `CustomPod` strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub environment: Labels,
}

/// Shape of the replicated workload a deployment produces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerTemplate {
    pub replicas: u32,

    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub replica_selector: Labels,

    /// Images run by each replica, by container name.
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub containers: Labels,
}

/// One rollout of a [`DeploymentConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub status: DeploymentStatus,

    #[serde(default)]
    pub strategy: DeploymentStrategy,

    #[serde(default)]
    pub controller_template: ControllerTemplate,
}

impl Deployment {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(id),
            ..Default::default()
        }
    }
}

impl Resource for Deployment {
    const KIND: &'static str = "Deployment";
    const NAME: &'static str = "deployment";
    const PREFIX: &'static str = "/deployments";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// What causes a new deployment to be produced from a config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeploymentTrigger {
    Manual,
    ConfigChange,
    #[serde(rename_all = "camelCase")]
    ImageChange {
        repository: String,
        tag: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        container_names: Vec<String>,
    },
}

/// Template every deployment of a config is stamped from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentTemplate {
    #[serde(default)]
    pub strategy: DeploymentStrategy,

    #[serde(default)]
    pub controller_template: ControllerTemplate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<DeploymentTrigger>,

    #[serde(default)]
    pub template: DeploymentTemplate,

    /// Number of deployments produced so far.
    #[serde(default)]
    pub latest_version: u64,
}

impl DeploymentConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(id),
            ..Default::default()
        }
    }

    /// The deployment for the config's current template, named after the
    /// config and its next version.
    pub fn next_deployment(&self) -> Deployment {
        let mut deployment = Deployment::new(format!("{}-{}", self.id(), self.latest_version + 1));
        deployment.metadata.labels = self.labels().clone();
        deployment.strategy = self.template.strategy.clone();
        deployment.controller_template = self.template.controller_template.clone();
        deployment
    }
}

impl Resource for DeploymentConfig {
    const KIND: &'static str = "DeploymentConfig";
    const NAME: &'static str = "deploymentConfig";
    const PREFIX: &'static str = "/deploymentConfigs";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Registries for deployments and deployment configs over one store.
pub struct DeployRegistry<S: ?Sized> {
    deployments: Registry<Deployment, S>,
    deployment_configs: Registry<DeploymentConfig, S>,
}

impl<S: ?Sized> Clone for DeployRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            deployments: self.deployments.clone(),
            deployment_configs: self.deployment_configs.clone(),
        }
    }
}

impl<S: KeyValueStore + ?Sized> DeployRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            deployments: Registry::new(Arc::clone(&store)),
            deployment_configs: Registry::new(store),
        }
    }

    pub fn with_diagnostics(store: Arc<S>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            deployments: Registry::with_diagnostics(Arc::clone(&store), Arc::clone(&sink)),
            deployment_configs: Registry::with_diagnostics(store, sink),
        }
    }

    pub fn deployments(&self) -> &Registry<Deployment, S> {
        &self.deployments
    }

    pub fn deployment_configs(&self) -> &Registry<DeploymentConfig, S> {
        &self.deployment_configs
    }

    pub fn list_deployments<L: LabelSelector + ?Sized>(
        &self,
        selector: &L,
    ) -> RegistryResult<Vec<Deployment>> {
        self.deployments.list(selector)
    }

    pub fn get_deployment(&self, id: &str) -> RegistryResult<Deployment> {
        self.deployments.get(id)
    }

    pub fn create_deployment(&self, deployment: &Deployment) -> RegistryResult<Deployment> {
        self.deployments.create(deployment)
    }

    pub fn update_deployment(&self, deployment: &Deployment) -> RegistryResult<Deployment> {
        self.deployments.update(deployment)
    }

    pub fn delete_deployment(&self, id: &str) -> RegistryResult<()> {
        self.deployments.delete(id)
    }

    pub fn watch_deployments<F>(
        &self,
        resource_version: &str,
        predicate: F,
    ) -> RegistryResult<WatchStream<Deployment>>
    where
        F: Fn(&Deployment) -> bool + Send + Sync + 'static,
    {
        self.deployments.watch(resource_version, predicate)
    }

    pub fn list_deployment_configs<L: LabelSelector + ?Sized>(
        &self,
        selector: &L,
    ) -> RegistryResult<Vec<DeploymentConfig>> {
        self.deployment_configs.list(selector)
    }

    pub fn get_deployment_config(&self, id: &str) -> RegistryResult<DeploymentConfig> {
        self.deployment_configs.get(id)
    }

    pub fn create_deployment_config(
        &self,
        config: &DeploymentConfig,
    ) -> RegistryResult<DeploymentConfig> {
        self.deployment_configs.create(config)
    }

    pub fn update_deployment_config(
        &self,
        config: &DeploymentConfig,
    ) -> RegistryResult<DeploymentConfig> {
        self.deployment_configs.update(config)
    }

    pub fn delete_deployment_config(&self, id: &str) -> RegistryResult<()> {
        self.deployment_configs.delete(id)
    }

    pub fn watch_deployment_configs<F>(
        &self,
        resource_version: &str,
        predicate: F,
    ) -> RegistryResult<WatchStream<DeploymentConfig>>
    where
        F: Fn(&DeploymentConfig) -> bool + Send + Sync + 'static,
    {
        self.deployment_configs.watch(resource_version, predicate)
    }
}
