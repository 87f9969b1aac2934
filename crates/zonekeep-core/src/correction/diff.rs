// ── Record-set diff ──
//
// Records are grouped by (lowercased owner, type) and compared as
// multisets of canonical presentations. TXT payloads are held joined in
// the model, so differing segmentation on either side never shows up as
// a change.

use std::collections::{BTreeMap, HashMap};

use super::{Change, Correction};
use crate::model::{Record, RecordType};

/// Drop DNSSEC-maintenance records.
pub fn strip_dnssec(records: Vec<Record>, origin: &str) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| !r.rtype().is_dnssec_maintenance(&r.name, origin))
        .collect()
}

/// Emission rank: name servers first, CNAME removals before the records
/// that may take their owner name, CNAME additions late, SOA last.
fn rank(correction: &Correction) -> u8 {
    match (correction.rtype(), &correction.change) {
        (Some(RecordType::NS), _) => 0,
        (Some(RecordType::CNAME), Change::Delete { .. }) => 1,
        (Some(RecordType::CNAME), _) => 3,
        (Some(RecordType::SOA), _) => 4,
        _ => 2,
    }
}

#[derive(Default)]
struct Group<'a> {
    live: Vec<&'a Record>,
    target: Vec<&'a Record>,
}

/// Ordered corrections turning `live` into `target`.
pub fn compute_corrections(
    live: &[Record],
    target: &[Record],
    origin: &str,
    skip_dnssec: bool,
) -> Vec<Correction> {
    let keep = |r: &&Record| !(skip_dnssec && r.rtype().is_dnssec_maintenance(&r.name, origin));

    let mut groups: BTreeMap<(String, RecordType), Group<'_>> = BTreeMap::new();
    for record in live.iter().filter(keep) {
        groups
            .entry(group_key(record))
            .or_default()
            .live
            .push(record);
    }
    for record in target.iter().filter(keep) {
        groups
            .entry(group_key(record))
            .or_default()
            .target
            .push(record);
    }

    let mut corrections = Vec::new();
    for group in groups.values() {
        diff_group(group, &mut corrections);
    }
    // Stable: groups keep name order and deletions stay ahead of additions.
    corrections.sort_by_key(rank);
    corrections
}

fn group_key(record: &Record) -> (String, RecordType) {
    (record.name.to_ascii_lowercase(), record.rtype())
}

fn diff_group(group: &Group<'_>, out: &mut Vec<Correction>) {
    let (removed, added) = multiset_difference(&group.live, &group.target);
    if removed.is_empty() && added.is_empty() {
        return;
    }

    if let ([old], [new], [_], [_]) = (
        removed.as_slice(),
        added.as_slice(),
        group.live.as_slice(),
        group.target.as_slice(),
    ) {
        out.push(Correction::update((*old).clone(), (*new).clone()));
        return;
    }

    out.extend(removed.into_iter().map(|r| Correction::delete(r.clone())));
    out.extend(added.into_iter().map(|r| Correction::add(r.clone())));
}

/// Records only in `live`, records only in `target`, counting duplicates.
fn multiset_difference<'a>(
    live: &[&'a Record],
    target: &[&'a Record],
) -> (Vec<&'a Record>, Vec<&'a Record>) {
    let mut remaining: HashMap<String, usize> = HashMap::new();
    for record in target {
        *remaining.entry(record.canonical()).or_default() += 1;
    }

    let mut removed = Vec::new();
    for &record in live {
        match remaining.get_mut(&record.canonical()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => removed.push(record),
        }
    }

    let mut added = Vec::new();
    for &record in target {
        let key = record.canonical();
        if let Some(count) = remaining.get_mut(&key) {
            if *count > 0 {
                *count -= 1;
                added.push(record);
            }
        }
    }
    (removed, added)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::correction::{Change, CorrectionKind};
    use pretty_assertions::assert_eq;

    const ORIGIN: &str = "example.com.";

    fn recs(lines: &[&str]) -> Vec<Record> {
        lines.iter().map(|l| l.parse().unwrap()).collect()
    }

    fn apply(live: &[Record], corrections: &[Correction]) -> Vec<Record> {
        let mut zone = live.to_vec();
        for c in corrections {
            c.apply_to(&mut zone).unwrap();
        }
        zone
    }

    fn sorted(records: &[Record]) -> Vec<String> {
        let mut out: Vec<String> = records.iter().map(Record::canonical).collect();
        out.sort();
        out
    }

    #[test]
    fn changed_address_is_a_single_update() {
        let live = recs(&["www.example.com. 300 IN A 1.2.3.4"]);
        let target = recs(&["www.example.com. 300 IN A 5.6.7.8"]);
        let corrections = compute_corrections(&live, &target, ORIGIN, true);
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].kind(), CorrectionKind::Update);
        let Change::Update { old, new } = &corrections[0].change else {
            panic!("expected update");
        };
        assert_eq!(old, &live[0]);
        assert_eq!(new, &target[0]);
    }

    #[test]
    fn dnssec_records_are_ignored_when_skipped() {
        let live = recs(&[
            "example.com. 300 IN A 1.2.3.4",
            "example.com. 300 IN RRSIG A 13 2 300 20240101000000 20231201000000 12345 example.com. abcd",
        ]);
        let target = recs(&["example.com. 300 IN A 1.2.3.4"]);
        assert!(compute_corrections(&live, &target, ORIGIN, true).is_empty());

        let kept = compute_corrections(&live, &target, ORIGIN, false);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].kind(), CorrectionKind::Deletion);
    }

    #[test]
    fn identical_sets_need_nothing() {
        let zone = recs(&[
            "example.com. 300 IN A 1.2.3.4",
            "example.com. 300 IN A 1.2.3.4",
            "www.example.com. 300 IN CNAME example.com.",
        ]);
        assert!(compute_corrections(&zone, &zone, ORIGIN, true).is_empty());
    }

    #[test]
    fn name_case_does_not_matter() {
        let live = recs(&["WWW.Example.com. 300 IN A 1.2.3.4"]);
        let target = recs(&["www.example.com. 300 IN A 1.2.3.4"]);
        assert!(compute_corrections(&live, &target, ORIGIN, true).is_empty());
    }

    #[test]
    fn uneven_groups_delete_before_adding() {
        let live = recs(&[
            "example.com. 300 IN A 192.0.2.1",
            "example.com. 300 IN A 192.0.2.2",
        ]);
        let target = recs(&[
            "example.com. 300 IN A 192.0.2.1",
            "example.com. 300 IN A 192.0.2.3",
        ]);
        let kinds: Vec<CorrectionKind> = compute_corrections(&live, &target, ORIGIN, true)
            .iter()
            .map(Correction::kind)
            .collect();
        assert_eq!(kinds, vec![CorrectionKind::Deletion, CorrectionKind::Addition]);
    }

    #[test]
    fn ns_first_cname_late_soa_last() {
        let live = recs(&[
            "example.com. 3600 IN SOA ns1.example.com. hostmaster.example.com. 1 7200 3600 1209600 300",
        ]);
        let target = recs(&[
            "example.com. 3600 IN SOA ns1.example.com. hostmaster.example.com. 2 7200 3600 1209600 300",
            "alias.example.com. 300 IN CNAME sub.example.com.",
            "sub.example.com. 300 IN NS ns.sub.example.com.",
            "a.example.com. 300 IN A 192.0.2.1",
        ]);
        let types: Vec<RecordType> = compute_corrections(&live, &target, ORIGIN, true)
            .iter()
            .filter_map(Correction::rtype)
            .collect();
        assert_eq!(
            types,
            vec![RecordType::NS, RecordType::A, RecordType::CNAME, RecordType::SOA]
        );
    }

    #[test]
    fn cname_removal_precedes_its_replacement() {
        let live = recs(&["www.example.com. 300 IN CNAME example.com."]);
        let target = recs(&[
            "www.example.com. 300 IN A 192.0.2.1",
            "alias.example.com. 300 IN CNAME www.example.com.",
        ]);
        let order: Vec<(CorrectionKind, Option<RecordType>)> =
            compute_corrections(&live, &target, ORIGIN, true)
                .iter()
                .map(|c| (c.kind(), c.rtype()))
                .collect();
        assert_eq!(
            order,
            vec![
                (CorrectionKind::Deletion, Some(RecordType::CNAME)),
                (CorrectionKind::Addition, Some(RecordType::A)),
                (CorrectionKind::Addition, Some(RecordType::CNAME)),
            ]
        );
    }

    #[test]
    fn ttl_only_change_shows_new_ttl() {
        let live = recs(&["www.example.com. 0 IN A 192.0.2.1"]);
        let target = recs(&["www.example.com. 3600 IN A 192.0.2.1"]);
        let corrections = compute_corrections(&live, &target, ORIGIN, true);
        assert_eq!(corrections.len(), 1);
        assert!(
            corrections[0].msg.ends_with("=> 3600 192.0.2.1"),
            "{}",
            corrections[0].msg
        );

        let address = compute_corrections(
            &recs(&["www.example.com. 300 IN A 192.0.2.1"]),
            &recs(&["www.example.com. 300 IN A 192.0.2.2"]),
            ORIGIN,
            true,
        );
        assert!(address[0].msg.ends_with("=> 192.0.2.2"), "{}", address[0].msg);
    }

    #[test]
    fn corrections_transform_live_into_target() {
        let live = recs(&[
            "example.com. 300 IN A 192.0.2.1",
            "example.com. 300 IN MX 10 mx1.example.com.",
            "old.example.com. 300 IN CNAME example.com.",
            r#"example.com. 300 IN TXT "one""#,
        ]);
        let target = recs(&[
            "example.com. 300 IN A 192.0.2.1",
            "example.com. 300 IN A 192.0.2.7",
            "example.com. 300 IN MX 20 mx2.example.com.",
            r#"example.com. 300 IN TXT "one""#,
            r#"example.com. 300 IN TXT "two""#,
            "new.example.com. 600 IN AAAA 2001:db8::1",
        ]);
        let corrections = compute_corrections(&live, &target, ORIGIN, true);
        let result = apply(&live, &corrections);
        assert_eq!(sorted(&result), sorted(&target));
        assert!(compute_corrections(&result, &target, ORIGIN, true).is_empty());
    }

    #[test]
    fn partial_application_converges() {
        let live = recs(&[
            "a.example.com. 300 IN A 192.0.2.1",
            "b.example.com. 300 IN A 192.0.2.2",
            "c.example.com. 300 IN A 192.0.2.3",
        ]);
        let target = recs(&[
            "a.example.com. 300 IN A 192.0.2.10",
            "b.example.com. 300 IN A 192.0.2.20",
            "d.example.com. 300 IN A 192.0.2.4",
        ]);
        let all = compute_corrections(&live, &target, ORIGIN, true);
        let n = all.len();
        for k in 0..n {
            let partial = apply(&live, &all[..k]);
            let rest = compute_corrections(&partial, &target, ORIGIN, true);
            assert!(rest.len() <= n - k, "k={k}: {} > {}", rest.len(), n - k);
            assert_eq!(sorted(&apply(&partial, &rest)), sorted(&target));
        }
    }

    #[test]
    fn txt_segmentation_is_not_a_change() {
        let live = recs(&[r#"example.com. 300 IN TXT "v=spf1 " "mx -all""#]);
        let target = recs(&[r#"example.com. 300 IN TXT "v=spf1 mx -all""#]);
        assert!(compute_corrections(&live, &target, ORIGIN, true).is_empty());
    }
}
