use std::sync::Arc;

use chunk_source::ChunkSource;
use chunk_source_mastra::{MastraChunkSource, MastraSourceConfig, MASTRA_SOURCE_ID};
use chunk_source_mock::{MockChunkSource, MOCK_SOURCE_ID};

/// Resolves the chunk source selected at startup.
pub fn source_for_id(
    source_id: &str,
    mastra: &MastraSourceConfig,
) -> Result<Arc<dyn ChunkSource>, String> {
    match source_id {
        MOCK_SOURCE_ID => Ok(Arc::new(MockChunkSource::weather_demo())),
        MASTRA_SOURCE_ID => MastraChunkSource::new(mastra.clone())
            .map(|source| Arc::new(source) as Arc<dyn ChunkSource>)
            .map_err(|error| error.to_string()),
        unknown => Err(format!(
            "Unsupported source '{unknown}'. Available sources: {MOCK_SOURCE_ID}, {MASTRA_SOURCE_ID}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_for_id_supports_mock() {
        let source = source_for_id("mock", &MastraSourceConfig::default())
            .expect("mock source should resolve");

        assert_eq!(source.profile().source_id, "mock");
        assert_eq!(source.profile().agent_id, "weather-agent");
    }

    #[test]
    fn source_for_id_builds_mastra_without_network() {
        let config = MastraSourceConfig::new("planner").with_base_url("http://127.0.0.1:9");
        let source = source_for_id("mastra", &config).expect("mastra source should resolve");

        assert_eq!(source.profile().source_id, "mastra");
        assert_eq!(source.profile().agent_id, "planner");
    }

    #[test]
    fn source_for_id_rejects_unknown_source() {
        let error = match source_for_id("custom", &MastraSourceConfig::default()) {
            Ok(_) => panic!("unknown sources should fail"),
            Err(error) => error,
        };

        assert!(error.contains("Unsupported source 'custom'"));
    }

    #[test]
    fn source_for_id_surfaces_mastra_config_errors() {
        let config = MastraSourceConfig::new("planner").with_base_url("file:///tmp");
        let error = match source_for_id("mastra", &config) {
            Ok(_) => panic!("file base url should fail"),
            Err(error) => error,
        };

        assert!(error.contains("invalid base URL"));
    }
}
