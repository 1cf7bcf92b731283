pub mod analyze;
pub mod scan;

use hwdoctor_core::Probe;
use hwdoctor_core::default_probes;

/// Select probes by id, "all" for everything, or the full default set when
/// no filter is given. Matching is case-insensitive and partial, so
/// `--probes cpu` picks up both `cpu` and `bench-cpu`.
pub fn select_probes(filter: Option<&str>) -> Vec<Box<dyn Probe>> {
    let all = default_probes();
    let Some(filter) = filter else {
        return all;
    };
    if filter == "all" {
        return all;
    }

    let names: Vec<String> = filter
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    let selected: Vec<Box<dyn Probe>> = all
        .into_iter()
        .filter(|probe| {
            let id = probe.id().to_lowercase();
            names.iter().any(|n| id.contains(n))
        })
        .collect();

    if selected.is_empty() {
        eprintln!("Warning: no probes matched filter '{filter}', using all");
        return default_probes();
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // select_probes tests
    // -----------------------------------------------------------------------

    #[test]
    fn no_filter_returns_everything() {
        assert_eq!(select_probes(None).len(), default_probes().len());
    }

    #[test]
    fn all_returns_everything() {
        assert_eq!(select_probes(Some("all")).len(), default_probes().len());
    }

    #[test]
    fn partial_match_picks_related_probes() {
        let probes = select_probes(Some("cpu"));
        let ids: Vec<&str> = probes.iter().map(|p| p.id()).collect();
        assert!(ids.contains(&"cpu"));
        assert!(ids.contains(&"bench-cpu"));
        assert!(!ids.contains(&"memory"));
    }

    #[test]
    fn comma_separated_filter() {
        let probes = select_probes(Some("memory, battery"));
        let ids: Vec<&str> = probes.iter().map(|p| p.id()).collect();
        assert!(ids.contains(&"memory"));
        assert!(ids.contains(&"battery"));
        assert!(!ids.contains(&"storage"));
    }

    #[test]
    fn bogus_filter_falls_back_to_all() {
        assert_eq!(
            select_probes(Some("flux-capacitor")).len(),
            default_probes().len()
        );
    }
}
