use super::ServerConfig;

impl ServerConfig {
    /// Validate the merged configuration.
    ///
    /// Provider keys are intentionally not required here: the server can
    /// boot without them and rejects voice connections at upgrade time
    /// instead, which keeps health checks and tests key-free.
    pub(super) fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.host.is_empty() {
            return Err("HOST must not be empty".into());
        }
        if !(0.0..=2.0).contains(&self.groq_temperature) {
            return Err(format!(
                "GROQ_TEMPERATURE must be between 0.0 and 2.0 (got {})",
                self.groq_temperature
            )
            .into());
        }

        let orchestrator = &self.orchestrator;
        if orchestrator.stt_job_queue_cap == 0
            || orchestrator.text_stream_queue_cap == 0
            || orchestrator.audio_output_queue_cap == 0
        {
            return Err("Queue capacities must be at least 1".into());
        }
        if orchestrator.decision_debounce_ms > 5_000 {
            return Err("DECISION_DEBOUNCE_MS above 5000 would stall every turn".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_queue_capacity() {
        let mut config = ServerConfig::default();
        config.orchestrator.audio_output_queue_cap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let config = ServerConfig {
            groq_temperature: 3.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_excessive_debounce() {
        let mut config = ServerConfig::default();
        config.orchestrator.decision_debounce_ms = 10_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_address_formatting() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.address(), "127.0.0.1:8080");
    }
}
