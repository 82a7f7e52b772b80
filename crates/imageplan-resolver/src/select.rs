use imageplan_core::PackageId;

/// Chooses which catalog version satisfies a dependency on `want`.
pub trait CandidateSelector {
    fn select(&self, want: &PackageId, candidates: &[PackageId]) -> PackageId;
}

/// Greedy "best available" policy: the newest candidate that is a strict
/// successor of `want`, or `want` itself when nothing newer exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestSuccessor;

impl CandidateSelector for HighestSuccessor {
    fn select(&self, want: &PackageId, candidates: &[PackageId]) -> PackageId {
        select_highest_successor(want, candidates)
            .cloned()
            .unwrap_or_else(|| want.clone())
    }
}

pub fn select_highest_successor<'a>(
    want: &PackageId,
    candidates: &'a [PackageId],
) -> Option<&'a PackageId> {
    candidates
        .iter()
        .filter(|candidate| candidate.is_successor(want))
        .max_by(|a, b| a.version().cmp_precedence(b.version()))
}

#[cfg(test)]
mod tests {
    use imageplan_core::PackageId;

    use crate::{select_highest_successor, CandidateSelector, HighestSuccessor};

    fn id(input: &str) -> PackageId {
        PackageId::parse(input).expect("identifier should parse")
    }

    #[test]
    fn selects_newest_successor() {
        let candidates = vec![id("lib@1.2"), id("lib@2.0"), id("lib@1.7"), id("zlib@9.0")];
        let selected = select_highest_successor(&id("lib@1.5"), &candidates).expect("must select");
        assert_eq!(selected, &id("lib@2.0"));
    }

    #[test]
    fn falls_back_to_wanted_version_without_successors() {
        let candidates = vec![id("lib@1.0"), id("lib@1.5")];
        let selected = HighestSuccessor.select(&id("lib@1.5,5.11"), &candidates);
        assert_eq!(selected, id("lib@1.5,5.11"));
    }
}
