use crate::engines::generation::RunContext;
use crate::error::Result;
use crate::types::DynamicDepth;

/// Depth for a newly built or resized fraction under the configured policy.
///
/// Adaptive modes stay within one level of the current best solution's
/// depth; random mode draws below the configured maximum.
pub fn determine_depth(ctx: &mut RunContext) -> Result<usize> {
    let frac_depth = ctx.config.model.frac_depth;
    match ctx.config.model.dynamic_depth {
        DynamicDepth::None => Ok(frac_depth),
        DynamicDepth::Adaptive | DynamicDepth::AdaptiveMutation => {
            let pocket = ctx.pocket_depth as i64;
            let depth = ctx.random.int(pocket - 1, pocket + 1)?;
            Ok(depth.max(0) as usize)
        }
        DynamicDepth::Random => {
            let upper = frac_depth.saturating_sub(1) as i64;
            Ok(ctx.random.int(0, upper)? as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn ctx_with(mode: DynamicDepth) -> RunContext {
        let mut config = AppConfig::default();
        config.model.dynamic_depth = mode;
        config.model.frac_depth = 4;
        RunContext::new(config).unwrap()
    }

    #[test]
    fn test_fixed_depth() {
        let mut ctx = ctx_with(DynamicDepth::None);
        assert_eq!(determine_depth(&mut ctx).unwrap(), 4);
    }

    #[test]
    fn test_adaptive_stays_near_pocket_depth() {
        let mut ctx = ctx_with(DynamicDepth::Adaptive);
        ctx.pocket_depth = 3;
        for _ in 0..100 {
            let d = determine_depth(&mut ctx).unwrap();
            assert!((2..=4).contains(&d));
        }
        ctx.pocket_depth = 0;
        for _ in 0..100 {
            assert!(determine_depth(&mut ctx).unwrap() <= 1);
        }
    }

    #[test]
    fn test_random_below_configured_depth() {
        let mut ctx = ctx_with(DynamicDepth::Random);
        for _ in 0..100 {
            assert!(determine_depth(&mut ctx).unwrap() < 4);
        }
    }
}
