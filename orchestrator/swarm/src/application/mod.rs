// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod driver;
pub mod mesh;
pub mod pipeline;
pub mod star;

pub use driver::Orchestrator;
pub use mesh::MeshOrchestrator;
pub use pipeline::PipelineOrchestrator;
pub use star::StarOrchestrator;
