//! Field listing

use super::*;

impl<B: ProjectService> CommandExecutor<B> {
    /// Project fields from the snapshot, or fetched with `--refresh`
    pub fn list_fields(&self) -> Result<MetadataCache> {
        self.load_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_helpers::{config, setup};
    use super::*;
    use crate::metadata::MetadataOrigin;
    use crate::resolver::test_fixtures::sample_metadata;
    use crate::service::InMemoryBackend;

    #[test]
    fn test_list_fields_from_snapshot() {
        let (executor, backend) = setup();
        let cache = executor.list_fields().unwrap();
        assert_eq!(cache.origin(), MetadataOrigin::Snapshot);
        assert_eq!(cache.metadata().fields.len(), 4);
        assert_eq!(backend.metadata_fetches(), 0);
    }

    #[test]
    fn test_refresh_fetches() {
        let backend = InMemoryBackend::with_metadata(sample_metadata());
        let executor = CommandExecutor::new(backend.clone(), config(), true);
        assert_eq!(executor.list_fields().unwrap().origin(), MetadataOrigin::Remote);
        assert_eq!(backend.metadata_fetches(), 1);
    }
}
