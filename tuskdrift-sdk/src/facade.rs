// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! `TuskDrift` — the facade that wires config, logging, the CLI
//! transport, every subsystem crate, and the reference HTTP driver into
//! the one object a host application constructs at startup. Grounded on
//! `agentreplay_server::run_server`'s top-level wiring (config → init
//! logging → build subsystems → hand back a running handle).

use crate::config::TuskConfig;
use crate::error::{Result, SdkError};
use crate::trackers::{DateTracker, EnvTracker};
use std::sync::Arc;
use std::time::Duration;
use tuskdrift_core::TraceBlockingManager;
use tuskdrift_export::adapters::ExportAdapter;
use tuskdrift_export::BatchProcessorConfig;
use tuskdrift_http::{HttpDriver, MockProvider, Mode};
use tuskdrift_transform::TransformEngine;
use tuskdrift_transport::{ConnInfo, TransportClient};

/// Connection metadata sent in `SDK_CONNECT` (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    pub service_id: String,
    pub sdk_version: String,
    pub min_cli_version: String,
}

/// Everything a host application needs to drive instrumentation: the
/// resolved mode, the reference HTTP driver, the shared trace-blocking
/// manager, and the Env/Date trackers spec.md §9 calls for in place of
/// global patching.
pub struct TuskDrift {
    config: TuskConfig,
    mode: Mode,
    http_driver: Arc<HttpDriver>,
    transport: Option<Arc<TransportClient>>,
    env_tracker: EnvTracker,
    date_tracker: DateTracker,
}

impl TuskDrift {
    /// Initializes logging, resolves the config/env precedence chain,
    /// compiles the transform engine, optionally connects the CLI
    /// transport (REPLAY requires it; RECORD degrades to DISABLED on
    /// failure per spec.md §5), and builds the reference HTTP driver.
    ///
    /// `sampling_rate_override` is the "init param" tier of spec.md
    /// §6's samplingRate precedence; pass `None` if the host app has no
    /// opinion.
    pub async fn init(
        config: TuskConfig,
        identity: ServiceIdentity,
        adapters: Vec<Arc<dyn ExportAdapter>>,
        sampling_rate_override: Option<f64>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        crate::logging::init_logging(config.log_level);

        let sampling_rate = config.resolve_sampling_rate(sampling_rate_override);
        tracing::info!(
            env = %config.env,
            sampling_rate,
            mode = ?config.mode,
            "initializing tuskdrift"
        );

        let transform = Arc::new(
            TransformEngine::compile(&config.transforms)
                .map_err(|e| SdkError::Config(e.to_string()))?,
        );

        let requested_mode = config.mode.map(Into::into).unwrap_or(Mode::Disabled);

        let (mode, transport, mock_provider): (
            Mode,
            Option<Arc<TransportClient>>,
            Option<Arc<dyn MockProvider>>,
        ) = match requested_mode {
            Mode::Disabled => (Mode::Disabled, None, None),
            requested => match config.mock_conn.clone() {
                None if requested == Mode::Replay => {
                    return Err(SdkError::Config(
                        "REPLAY mode requires TUSK_MOCK_SOCKET or TUSK_MOCK_HOST/TUSK_MOCK_PORT"
                            .to_string(),
                    ));
                }
                None => {
                    tracing::warn!("no mock transport configured; running without CLI connection");
                    (requested, None, None)
                }
                Some(target) => {
                    let client = TransportClient::new();
                    let conn_info: ConnInfo = target.into();
                    match client
                        .connect(
                            conn_info,
                            identity.service_id.clone(),
                            identity.sdk_version.clone(),
                            identity.min_cli_version.clone(),
                            connect_timeout,
                        )
                        .await
                    {
                        Ok(()) => {
                            let provider: Arc<dyn MockProvider> = Arc::new(
                                tuskdrift_http::TransportMockProvider::new(client.clone()),
                            );
                            (requested, Some(client), Some(provider))
                        }
                        Err(err) => {
                            if requested == Mode::Replay {
                                return Err(SdkError::Transport(err));
                            }
                            tracing::warn!(
                                error = %err,
                                "CLI transport connect failed in RECORD mode; disabling instrumentation"
                            );
                            (Mode::Disabled, None, None)
                        }
                    }
                }
            },
        };

        let http_driver = HttpDriver::new(
            mode,
            adapters,
            BatchProcessorConfig::default(),
            transform,
            mock_provider,
            transport.clone(),
        );
        http_driver.spawn_flush_loop();

        Ok(Self {
            config,
            mode,
            http_driver,
            transport,
            env_tracker: EnvTracker::new(),
            date_tracker: DateTracker::new(),
        })
    }

    pub fn config(&self) -> &TuskConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn http_driver(&self) -> &Arc<HttpDriver> {
        &self.http_driver
    }

    pub fn transport(&self) -> Option<&Arc<TransportClient>> {
        self.transport.as_ref()
    }

    pub fn blocking_manager(&self) -> &Arc<TraceBlockingManager> {
        self.http_driver.blocking_manager()
    }

    pub fn env_tracker(&self) -> &EnvTracker {
        &self.env_tracker
    }

    pub fn date_tracker(&self) -> &DateTracker {
        &self.date_tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuskdrift_export::adapters::InMemoryAdapter;

    fn identity() -> ServiceIdentity {
        ServiceIdentity {
            service_id: "test-service".to_string(),
            sdk_version: "0.1.0".to_string(),
            min_cli_version: "0.1.0".to_string(),
        }
    }

    #[tokio::test]
    async fn disabled_mode_needs_no_transport() {
        let config = TuskConfig::default();
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![Arc::new(InMemoryAdapter::new(16))];

        let sdk = TuskDrift::init(config, identity(), adapters, None, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(sdk.mode(), Mode::Disabled);
        assert!(sdk.transport().is_none());
    }

    #[tokio::test]
    async fn replay_without_mock_conn_is_a_config_error() {
        let config = TuskConfig {
            mode: Some(crate::config::DriftMode::Replay),
            ..Default::default()
        };
        let adapters: Vec<Arc<dyn ExportAdapter>> = vec![Arc::new(InMemoryAdapter::new(16))];

        let err = TuskDrift::init(config, identity(), adapters, None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }
}
