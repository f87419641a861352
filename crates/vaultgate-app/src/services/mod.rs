// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — wires the gateway crates together for the command line.
//
// The CLI only parses arguments and prints; everything it runs goes through
// `GatewayServices`.

pub mod data_dir;
pub mod gateway_services;
