#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.llm.backend, BackendKind::OpenAi);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.evidence.base_url, "https://myvariant.info/v1");
        assert_eq!(config.evidence.timeout_secs, 30);
        assert_eq!(config.assessment.max_concurrency, 4);
        assert_eq!(config.assessment.snippet_budget, 4000);
        assert_eq!(config.assessment.retry, RetryPolicy::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            r#"
            [llm]
            backend = "ollama"
            model = "llama3:8b"
            base_url = "http://gpu-box:11434"

            [assessment.retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.backend, BackendKind::Ollama);
        assert_eq!(config.llm.base_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.assessment.retry.max_attempts, 5);
        assert_eq!(config.assessment.retry.initial_backoff_ms, 1_000);

        let assess = config.assess_config();
        assert_eq!(assess.model, "llama3:8b");
        assert_eq!(assess.retry.max_attempts, 5);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Config::from_toml_str("[llm]\nbackend = \"watson\"").is_err());
    }

    #[test]
    fn test_api_key_precedence() {
        let mut config = Config::default();
        let env = |name: &str| match name {
            "TUMORBOARD_OPENAI_API_KEY" => Some("from-tumorboard-env".to_string()),
            "OPENAI_API_KEY" => Some("from-provider-env".to_string()),
            _ => None,
        };
        assert_eq!(config.api_key(env).unwrap().expose_secret(), "from-tumorboard-env");

        let provider_only = |name: &str| (name == "OPENAI_API_KEY").then(|| "from-provider-env".to_string());
        assert_eq!(config.api_key(provider_only).unwrap().expose_secret(), "from-provider-env");

        config.llm.api_key = Some("from-file".to_string());
        assert_eq!(config.api_key(env).unwrap().expose_secret(), "from-file");

        config.llm.api_key = Some("  ".to_string());
        assert!(config.api_key(|_| None).is_none());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[evidence]\ntimeout_secs = 5").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.evidence.timeout_secs, 5);

        assert!(Config::load(Some(Path::new("/nonexistent/tumorboard.toml"))).is_err());
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("sk-secret"));
    }
}
