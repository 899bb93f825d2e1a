// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Engine settings.
//!
//! This module contains engine telemetry/logging settings.

pub mod telemetry;
