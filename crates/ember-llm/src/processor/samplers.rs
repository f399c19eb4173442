use ember_config::{OverrideSamplersConfig, SamplerOverride};

use crate::types::SamplingParams;

fn apply_one<T: Copy>(field: &mut Option<T>, rule: Option<SamplerOverride<T>>) {
    match rule {
        None => {}
        Some(SamplerOverride::Unset(_)) => *field = None,
        Some(SamplerOverride::Value(value)) => *field = Some(value),
    }
}

/// Force or remove each configured sampler; zero is a real value here
pub(super) fn apply(overrides: &OverrideSamplersConfig, params: &mut SamplingParams) {
    apply_one(&mut params.temperature, overrides.temperature);
    apply_one(&mut params.top_p, overrides.top_p);
    apply_one(&mut params.top_k, overrides.top_k);
    apply_one(&mut params.top_a, overrides.top_a);
    apply_one(&mut params.min_p, overrides.min_p);
    apply_one(&mut params.frequency_penalty, overrides.frequency_penalty);
    apply_one(&mut params.presence_penalty, overrides.presence_penalty);
    apply_one(&mut params.repetition_penalty, overrides.repetition_penalty);
}
