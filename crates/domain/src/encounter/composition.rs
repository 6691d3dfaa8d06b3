//! Stage composition policies applied after expansion.

/// Substrings marking an actor as ranged.
pub const RANGED_KEYWORDS: [&str; 11] = [
    "Archer", "Archmage", "Lobber", "Shaman", "Mage", "Ranger", "Hunter", "Stalker", "Priest",
    "Gunner", "Alchemist",
];

pub const MAX_RANGED_PER_STAGE: usize = 1;

pub fn is_ranged(actor_id: &str) -> bool {
    RANGED_KEYWORDS.iter().any(|k| actor_id.contains(k))
}

/// Replace ranged actors beyond the per-stage cap with the first non-ranged
/// actor in the list.
///
/// Best effort: with no non-ranged actor available the list is returned
/// unchanged.
pub fn cap_ranged(actors: Vec<String>) -> Vec<String> {
    let Some(substitute) = actors.iter().find(|a| !is_ranged(a)).cloned() else {
        return actors;
    };

    let mut ranged_seen = 0;
    actors
        .into_iter()
        .map(|actor| {
            if !is_ranged(&actor) {
                return actor;
            }
            if ranged_seen >= MAX_RANGED_PER_STAGE {
                return substitute.clone();
            }
            ranged_seen += 1;
            actor
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn when_id_contains_keyword_then_actor_is_ranged() {
        assert!(is_ranged("Skeleton_Sand_Archer"));
        assert!(is_ranged("Trork_Shaman"));
        assert!(is_ranged("Skeleton_Burnt_Alchemist"));
        assert!(!is_ranged("Skeleton_Soldier"));
    }

    #[test]
    fn when_stage_has_extra_ranged_then_first_melee_substitutes() {
        let capped = cap_ranged(ids(&[
            "Skeleton_Archer",
            "Skeleton_Soldier",
            "Skeleton_Archmage",
            "Skeleton_Knight",
        ]));
        assert_eq!(
            capped,
            ids(&["Skeleton_Archer", "Skeleton_Soldier", "Skeleton_Soldier", "Skeleton_Knight"])
        );
        assert_eq!(capped.iter().filter(|a| is_ranged(a)).count(), 1);
    }

    #[test]
    fn when_every_actor_is_ranged_then_list_is_unchanged() {
        let list = ids(&["Archer", "Mage"]);
        assert_eq!(cap_ranged(list.clone()), list);
    }

    #[test]
    fn when_capping_then_length_is_preserved() {
        let list = ids(&["Hunter", "Hunter", "Hunter", "Brute"]);
        assert_eq!(cap_ranged(list).len(), 4);
    }
}
