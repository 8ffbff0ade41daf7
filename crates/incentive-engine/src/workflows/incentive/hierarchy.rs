use super::domain::MonthlyTable;
use crate::workflows::audit::{AuditKind, AuditTrail};

/// Reporting tree over table positions, derived from each record's manager reference.
#[derive(Debug, Clone, Default)]
pub struct OrgTree {
    children: Vec<Vec<usize>>,
}

impl OrgTree {
    /// Builds the tree. When manager references form a loop, the member with the highest
    /// employee id loses its manager and becomes the loop's root; the cut is noted.
    pub fn build(table: &MonthlyTable, audit: &mut AuditTrail) -> Self {
        let records = table.records();
        let mut parent: Vec<Option<usize>> = records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                record
                    .manager_id
                    .as_ref()
                    .and_then(|manager| table.position(manager))
                    .filter(|manager| *manager != position)
            })
            .collect();

        for start in 0..parent.len() {
            let mut members = vec![start];
            let mut cursor = parent[start];
            while let Some(next) = cursor {
                if next == start {
                    // Positions follow id order, so the largest position is the highest id.
                    let root = members.iter().copied().max().unwrap_or(start);
                    audit.record(
                        AuditKind::HierarchyCycle,
                        records[root].employee_id.as_str(),
                        "manager chain loops back; reporting line cut at this employee",
                    );
                    parent[root] = None;
                    break;
                }
                // Leads into a loop owned by someone else; cut when that member is visited.
                if members.len() > parent.len() {
                    break;
                }
                members.push(next);
                cursor = parent[next];
            }
        }

        let mut children = vec![Vec::new(); records.len()];
        for (position, manager) in parent.iter().enumerate() {
            if let Some(manager) = manager {
                children[*manager].push(position);
            }
        }
        Self { children }
    }

    pub fn direct_reports(&self, position: usize) -> &[usize] {
        self.children.get(position).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every transitive subordinate of `position`, excluding itself, in ascending order.
    pub fn subtree(&self, position: usize) -> Vec<usize> {
        let mut visited = vec![false; self.children.len()];
        let mut stack: Vec<usize> = self.direct_reports(position).to_vec();
        let mut found = Vec::new();
        while let Some(next) = stack.pop() {
            if next == position || std::mem::replace(&mut visited[next], true) {
                continue;
            }
            found.push(next);
            stack.extend_from_slice(self.direct_reports(next));
        }
        found.sort_unstable();
        found
    }
}
