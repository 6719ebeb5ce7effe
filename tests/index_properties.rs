//! Property tests for the participant index ordering guarantees.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use mailindex::parser::{parse_message, ParserOptions};
use mailindex::{Message, ParticipantIndex};

fn base() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2001-05-01T00:00:00-07:00").unwrap()
}

fn message(id: usize, minutes: i64) -> Message {
    let sent = base() + Duration::minutes(minutes);
    let text = format!(
        "Message-ID: <{id}@x>\nDate: {}\nFrom: a@x.com\nTo: b@x.com\nSubject: #{id}\n",
        sent.format("%a, %d %b %Y %H:%M:%S %z")
    );
    parse_message(&text, &ParserOptions::default()).unwrap()
}

fn build(messages: &[Message]) -> ParticipantIndex {
    let mut index = ParticipantIndex::new();
    for m in messages {
        index.insert(m.clone());
    }
    index
}

proptest! {
    #[test]
    fn insertion_order_does_not_change_ordering(
        minutes in prop::collection::vec(0i64..5_000, 1..40),
        seed in any::<u64>(),
    ) {
        let messages: Vec<Message> = minutes
            .iter()
            .enumerate()
            .map(|(i, m)| message(i, *m))
            .collect();
        let mut shuffled = messages.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(seed));

        let now = Utc::now();
        let a = build(&messages);
        let b = build(&shuffled);
        let found_a = a.search("a@x.com", &now).unwrap();
        let found_b = b.search("a@x.com", &now).unwrap();

        // No message lost to a timestamp collision.
        prop_assert_eq!(found_a.len(), messages.len());
        prop_assert_eq!(found_b.len(), messages.len());

        let times_a: Vec<_> = found_a.iter().map(|m| m.sent_instant()).collect();
        let times_b: Vec<_> = found_b.iter().map(|m| m.sent_instant()).collect();
        prop_assert_eq!(&times_a, &times_b);
        prop_assert!(times_a.windows(2).all(|w| w[0] >= w[1]));

        let mut ids_a: Vec<&str> = found_a.iter().map(|m| m.message_id()).collect();
        let mut ids_b: Vec<&str> = found_b.iter().map(|m| m.message_id()).collect();
        ids_a.sort_unstable();
        ids_b.sort_unstable();
        prop_assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn search_returns_exactly_messages_before_cutoff(
        minutes in prop::collection::vec(0i64..5_000, 1..40),
        cutoff_minutes in 0i64..5_000,
    ) {
        let messages: Vec<Message> = minutes
            .iter()
            .enumerate()
            .map(|(i, m)| message(i, *m))
            .collect();
        let index = build(&messages);
        let cutoff = base() + Duration::minutes(cutoff_minutes);

        let found = index.search("b@x.com", &cutoff).unwrap();
        let expected = minutes.iter().filter(|m| **m < cutoff_minutes).count();

        prop_assert_eq!(found.len(), expected);
        prop_assert!(found.iter().all(|m| m.sent_time() < cutoff));
    }

    #[test]
    fn sample_returns_distinct_messages(
        count in 0usize..30,
        n in 0usize..40,
    ) {
        let messages: Vec<Message> = (0..count).map(|i| message(i, i as i64)).collect();
        let index = build(&messages);

        match index.sample(n) {
            Ok(picked) => {
                prop_assert!(n <= count);
                let mut ids: Vec<&str> = picked.iter().map(|m| m.message_id()).collect();
                ids.sort_unstable();
                ids.dedup();
                prop_assert_eq!(ids.len(), n);
            }
            Err(_) => prop_assert!(n > count),
        }
    }
}
