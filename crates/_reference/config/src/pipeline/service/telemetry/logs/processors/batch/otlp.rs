// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! OTLP batch exporter level configurations.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::pipeline::service::telemetry::metrics::readers::periodic::otlp::OtlpProtocol;

/// OpenTelemetry OTLP Exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OtlpExporterConfig {
    /// The Otlp communication protocol to use when exporting data.
    #[serde(default)]
    pub protocol: OtlpProtocol,
    /// The endpoint to which the Otlp exporter will send data.
    pub endpoint: String,
}
