//! Browser User-Agent rotation.

use rand::seq::SliceRandom;
use rand::Rng;

/// Browser identification strings sent with probes.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Pick a User-Agent uniformly at random from `pool`.
///
/// Falls back to the first built-in agent when `pool` is empty.
pub fn pick_user_agent<'a, R: Rng + ?Sized>(pool: &[&'a str], rng: &mut R) -> &'a str {
    pool.choose(rng).copied().unwrap_or(USER_AGENTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_pick_user_agent_from_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let agent = pick_user_agent(USER_AGENTS, &mut rng);
            assert!(USER_AGENTS.contains(&agent));
        }
    }

    #[test]
    fn test_pick_user_agent_varies() {
        let mut rng = StdRng::seed_from_u64(42);
        let seen: HashSet<_> = (0..200)
            .map(|_| pick_user_agent(USER_AGENTS, &mut rng))
            .collect();
        assert_eq!(seen.len(), USER_AGENTS.len());
    }

    #[test]
    fn test_pick_user_agent_empty_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_user_agent(&[], &mut rng), USER_AGENTS[0]);
    }
}
