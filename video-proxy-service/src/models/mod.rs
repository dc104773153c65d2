pub mod generation;

pub use generation::{
    GenerationEnvelope, GenerationRequest, ProviderPayload, RawGenerationRequest,
};
