//! Retrieve: related memories for each freshly perceived event

use std::collections::BTreeMap;

use serde::Serialize;

use crate::memory::{AssociativeMemory, MemoryKind, PerceivedEvent};

/// A perceived event plus what the agent already knows about it
#[derive(Debug, Clone, Serialize)]
pub struct Retrieved {
    pub curr_event: PerceivedEvent,
    pub events: Vec<PerceivedEvent>,
    pub thoughts: Vec<PerceivedEvent>,
}

/// Bundle each perceived event with keyword-related events and thoughts
///
/// Keyed by the event's description; the event itself is not listed among
/// its own related events.
pub fn retrieve(memory: &AssociativeMemory, perceived: &[PerceivedEvent]) -> BTreeMap<String, Retrieved> {
    perceived
        .iter()
        .map(|curr| {
            let keywords: Vec<String> = curr.keywords.iter().cloned().collect();
            let events = memory
                .retrieve_by_keywords(MemoryKind::Event, &keywords)
                .into_iter()
                .filter(|m| m.id != curr.id)
                .cloned()
                .collect();
            let thoughts = memory
                .retrieve_by_keywords(MemoryKind::Thought, &keywords)
                .into_iter()
                .cloned()
                .collect();
            (
                curr.description().to_string(),
                Retrieved {
                    curr_event: curr.clone(),
                    events,
                    thoughts,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::Event;
    use crate::memory::NewMemory;
    use chrono::NaiveDate;

    #[test]
    fn test_bundles_related_memories() {
        let now = NaiveDate::from_ymd_opt(2023, 2, 13).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let mut memory = AssociativeMemory::new();
        memory.add(NewMemory::new(
            MemoryKind::Event,
            Event::new("Klaus Mueller", "is", "reading", "Klaus Mueller is reading"),
            now,
        ));
        memory.add(NewMemory::new(
            MemoryKind::Thought,
            Event::new("Klaus Mueller", "likes", "research", "Klaus Mueller likes research"),
            now,
        ));
        let curr = memory
            .add(NewMemory::new(
                MemoryKind::Event,
                Event::new("Klaus Mueller", "is", "writing", "Klaus Mueller is writing"),
                now,
            ))
            .clone();

        let retrieved = retrieve(&memory, &[curr]);
        let bundle = &retrieved["Klaus Mueller is writing"];
        assert_eq!(bundle.events.len(), 1);
        assert_eq!(bundle.events[0].description(), "Klaus Mueller is reading");
        assert_eq!(bundle.thoughts.len(), 1);
    }
}
