pub mod informer_registry_settings;
