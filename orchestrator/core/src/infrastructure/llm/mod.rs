// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Model Client Infrastructure - Anti-Corruption Layer Implementations
//
// Each adapter translates between CanonicalMessage and a vendor wire format.

pub mod openai;
pub mod registry;

pub use openai::OpenAIAdapter;
pub use registry::{ModelClientFactory, ProviderRegistry};
