use crate::dates::ParsedDate;
use crate::order::OrderLine;
use std::collections::BTreeMap;

/// Lines of one supplier, in mail order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierGroup {
    /// Lowercased, trimmed supplier name.
    pub key: String,
    /// Supplier name as first seen in the sheet, trimmed.
    pub name: String,
    pub lines: Vec<OrderLine>,
}

/// Keep the lines whose status asks for a follow-up (`n/b` or `mail`).
pub fn classify(lines: Vec<OrderLine>) -> Vec<OrderLine> {
    let total = lines.len();
    let selected: Vec<OrderLine> = lines
        .into_iter()
        .filter(|l| {
            let status = l.normalized_status();
            tracing::trace!(row = l.row, status = status.as_token(), "status");
            status.is_follow_up()
        })
        .collect();

    tracing::info!(selected = selected.len(), total, "filtered on status n/b or mail");
    selected
}

/// Group lines by supplier key. Lines without a supplier name are dropped.
pub fn group_by_supplier(lines: Vec<OrderLine>) -> BTreeMap<String, SupplierGroup> {
    let mut groups: BTreeMap<String, SupplierGroup> = BTreeMap::new();

    for line in lines {
        let key = line.supplier_key();
        if key.is_empty() {
            tracing::debug!(row = line.row, "skipping line without supplier");
            continue;
        }

        groups
            .entry(key.clone())
            .or_insert_with(|| SupplierGroup {
                key,
                name: line.supplier.trim().to_string(),
                lines: Vec::new(),
            })
            .lines
            .push(line);
    }

    groups
}

/// Sort by current delivery date, oldest first, undated lines last. The
/// sort is stable.
pub fn sort_group(group: &mut SupplierGroup) {
    group
        .lines
        .sort_by_cached_key(|l| ParsedDate::parse(l.current_delivery.as_deref()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::line;

    #[test]
    fn test_classify_selects_follow_up_rows() {
        let lines = vec![
            line("Acme", "N/B", ""),
            line("acme ", "Mail", ""),
            line("ACME", "Done", ""),
            line("ACME", "#N/A", ""),
        ];
        let selected = classify(lines);

        assert_eq!(selected.len(), 3);
        assert!(selected.iter().all(|l| l.status != "Done"));
    }

    #[test]
    fn test_group_case_insensitive() {
        let lines = vec![line("Acme", "N/B", ""), line("acme ", "Mail", ""), line("ACME", "#N/A", "")];
        let groups = group_by_supplier(lines);

        assert_eq!(groups.len(), 1);
        let group = &groups["acme"];
        assert_eq!(group.key, "acme");
        assert_eq!(group.name, "Acme");
        assert_eq!(group.lines.len(), 3);
    }

    #[test]
    fn test_group_drops_blank_supplier() {
        let lines = vec![line("  ", "N/B", ""), line("Bolt", "N/B", ""), line("Acme", "N/B", "")];
        let groups = group_by_supplier(lines);

        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["acme", "bolt"]);
    }

    #[test]
    fn test_sort_undated_last() {
        let mut group = SupplierGroup {
            key: "acme".into(),
            name: "Acme".into(),
            lines: vec![
                line("Acme", "N/B", "10-01-2025"),
                line("Acme", "N/B", "no date"),
                line("Acme", "N/B", "05-01-2025"),
            ],
        };
        sort_group(&mut group);

        let order: Vec<&str> = group
            .lines
            .iter()
            .map(|l| l.current_delivery.as_deref().unwrap())
            .collect();
        assert_eq!(order, vec!["05-01-2025", "10-01-2025", "no date"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut a = line("Acme", "N/B", "");
        a.order_number = Some("A".into());
        let mut b = line("Acme", "N/B", "01-01-2025");
        b.order_number = Some("B".into());
        let mut c = line("Acme", "N/B", "");
        c.order_number = Some("C".into());

        let mut group = SupplierGroup {
            key: "acme".into(),
            name: "Acme".into(),
            lines: vec![a, b, c],
        };
        sort_group(&mut group);

        let order: Vec<&str> = group.lines.iter().map(|l| l.order_number.as_deref().unwrap()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }
}
