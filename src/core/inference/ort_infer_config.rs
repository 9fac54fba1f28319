use crate::core::config::{
    OrtExecutionProvider, OrtGraphOptimizationLevel as OG, OrtSessionConfig,
};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::builder::{GraphOptimizationLevel as GOL, SessionBuilder};

pub(super) fn apply_ort_config(
    mut builder: SessionBuilder,
    cfg: &OrtSessionConfig,
) -> Result<SessionBuilder, ort::Error> {
    if let Some(intra) = cfg.intra_threads {
        builder = builder.with_intra_threads(intra)?;
    }
    if let Some(inter) = cfg.inter_threads {
        builder = builder.with_inter_threads(inter)?;
    }
    if let Some(level) = cfg.optimization_level {
        let mapped = match level {
            OG::DisableAll => GOL::Disable,
            OG::Level1 => GOL::Level1,
            OG::Level2 => GOL::Level2,
            OG::Level3 => GOL::Level3,
        };
        builder = builder.with_optimization_level(mapped)?;
    }
    if let Some(eps) = &cfg.execution_providers {
        let providers = build_execution_providers(eps)?;
        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers)?;
        }
    }
    Ok(builder)
}

fn build_execution_providers(
    eps: &[OrtExecutionProvider],
) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
    let mut providers = Vec::with_capacity(eps.len());

    for ep in eps {
        match ep {
            OrtExecutionProvider::CPU => {
                providers.push(ort::execution_providers::CPUExecutionProvider::default().build());
            }
            #[cfg(feature = "cuda")]
            OrtExecutionProvider::CUDA { device_id } => {
                let mut cuda = ort::execution_providers::CUDAExecutionProvider::default();
                if let Some(id) = device_id {
                    cuda = cuda.with_device_id(*id);
                }
                providers.push(cuda.build());
            }
            #[cfg(feature = "coreml")]
            OrtExecutionProvider::CoreML {
                ane_only,
                subgraphs,
            } => {
                use ort::execution_providers::coreml::CoreMLComputeUnits;
                let mut coreml = ort::execution_providers::CoreMLExecutionProvider::default();
                if let Some(true) = ane_only {
                    coreml = coreml.with_compute_units(CoreMLComputeUnits::CPUAndNeuralEngine);
                }
                if let Some(sub) = subgraphs {
                    coreml = coreml.with_subgraphs(*sub);
                }
                providers.push(coreml.build());
            }
            #[cfg(not(feature = "cuda"))]
            OrtExecutionProvider::CUDA { .. } => {
                return Err(ort::Error::new(
                    "CUDA execution provider requested but cuda feature is not enabled",
                ));
            }
            #[cfg(not(feature = "coreml"))]
            OrtExecutionProvider::CoreML { .. } => {
                return Err(ort::Error::new(
                    "CoreML execution provider requested but coreml feature is not enabled",
                ));
            }
        }
    }

    Ok(providers)
}
