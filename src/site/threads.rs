//! Prev/next links between message pages.

use std::collections::HashMap;

use crate::model::types::MessageRecord;

/// Neighbours of one message, by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub prev: Option<String>,
    pub next: Option<String>,
    pub prev_in_thread: Option<String>,
    pub next_in_thread: Option<String>,
}

/// Neighbour table for every record, indexed like `records`.
///
/// Chronological neighbours follow record order. Thread neighbours group by
/// `thread_id` and order by timestamp; the sort is stable so records without
/// a timestamp keep their relative order at the front of their thread.
pub fn neighbors(records: &[MessageRecord]) -> Vec<Neighbors> {
    let mut out: Vec<Neighbors> = records
        .iter()
        .enumerate()
        .map(|(i, _)| Neighbors {
            prev: i.checked_sub(1).map(|p| records[p].id.clone()),
            next: records.get(i + 1).map(|r| r.id.clone()),
            ..Neighbors::default()
        })
        .collect();

    let mut threads: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, rec) in records.iter().enumerate() {
        let key = if rec.thread_id.is_empty() { rec.id.as_str() } else { rec.thread_id.as_str() };
        threads.entry(key).or_default().push(i);
    }

    for members in threads.values_mut() {
        members.sort_by(|&a, &b| records[a].timestamp.cmp(&records[b].timestamp));
        for (pos, &idx) in members.iter().enumerate() {
            out[idx].prev_in_thread = pos.checked_sub(1).map(|p| records[members[p]].id.clone());
            out[idx].next_in_thread = members.get(pos + 1).map(|&n| records[n].id.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, thread: &str, ts: Option<&str>) -> MessageRecord {
        MessageRecord {
            id: id.into(),
            thread_id: thread.into(),
            subject: String::new(),
            author: String::new(),
            timestamp: ts.map(str::to_string),
            year: None,
            index_text: String::new(),
            full_text: String::new(),
        }
    }

    #[test]
    fn chronological_links_follow_record_order() {
        let records = vec![rec("1", "1", None), rec("2", "2", None), rec("3", "3", None)];
        let n = neighbors(&records);
        assert_eq!(n[0].prev, None);
        assert_eq!(n[0].next.as_deref(), Some("2"));
        assert_eq!(n[2].prev.as_deref(), Some("2"));
        assert_eq!(n[2].next, None);
        assert!(n.iter().all(|x| x.prev_in_thread.is_none() && x.next_in_thread.is_none()));
    }

    #[test]
    fn thread_links_sort_by_timestamp() {
        let records = vec![
            rec("10", "10", Some("2001-01-03T00:00:00Z")),
            rec("11", "99", Some("2001-01-01T00:00:00Z")),
            rec("12", "10", Some("2001-01-01T00:00:00Z")),
            rec("13", "10", Some("2001-01-02T00:00:00Z")),
        ];
        let n = neighbors(&records);
        // thread 10 ordered: 12, 13, 10
        assert_eq!(n[2].prev_in_thread, None);
        assert_eq!(n[2].next_in_thread.as_deref(), Some("13"));
        assert_eq!(n[3].prev_in_thread.as_deref(), Some("12"));
        assert_eq!(n[3].next_in_thread.as_deref(), Some("10"));
        assert_eq!(n[0].next_in_thread, None);
        assert_eq!(n[1], Neighbors { prev: Some("10".into()), next: Some("12".into()), ..Default::default() });
    }
}
