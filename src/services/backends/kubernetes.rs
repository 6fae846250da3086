pub mod authorization_informers;
pub mod indexer;
pub mod informer_registry;
pub mod kubeconfig_loader;
pub mod list_watch;
pub mod lister;
pub mod resource_kind;
pub mod resource_update_handler;
pub mod scope_policy;
pub mod shared_index_informer;
pub mod status;
