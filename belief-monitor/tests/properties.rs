use belief_monitor::{priority_rank, AlertBuilder, AlertConfig, BeliefConfidence, ChangeRecord, SuggestionBuilder};
use chrono::Utc;
use common::{ChangeType, Confidence, Probability};
use proptest::prelude::*;

fn change_type() -> impl Strategy<Value = ChangeType> {
    prop_oneof![
        Just(ChangeType::Initial),
        Just(ChangeType::SignificantDrop),
        Just(ChangeType::SignificantRise),
        Just(ChangeType::NoMaterialChange),
    ]
}

fn confidence() -> impl Strategy<Value = Confidence> {
    prop_oneof![Just(Confidence::Low), Just(Confidence::Medium), Just(Confidence::High)]
}

fn change_record() -> impl Strategy<Value = (ChangeRecord, Option<Confidence>)> {
    (
        "[a-e]{1,3}",
        change_type(),
        0.0f64..=1.0,
        prop::option::of(-1.0f64..=1.0),
        prop::option::of(confidence()),
    )
        .prop_map(|(entity_id, change_type, p, delta, confidence)| {
            (
                ChangeRecord {
                    entity_id,
                    event_id: "NEXT_ROUND_RAISED".to_string(),
                    change_type,
                    probability: Probability::new(p).unwrap(),
                    delta,
                    as_of: Utc::now(),
                },
                confidence,
            )
        })
}

proptest! {
    #[test]
    fn rank_never_rises_as_probability_rises(
        ct in change_type(),
        conf in confidence(),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let rank_low = priority_rank(ct, Probability::new(low).unwrap(), conf);
        let rank_high = priority_rank(ct, Probability::new(high).unwrap(), conf);
        prop_assert!(rank_high <= rank_low, "p={} rank {} vs p={} rank {}", low, rank_low, high, rank_high);
    }

    #[test]
    fn rank_stays_within_change_type_band(ct in change_type(), conf in confidence(), p in 0.0f64..=1.0) {
        let base = match ct {
            ChangeType::SignificantDrop => 1,
            ChangeType::SignificantRise => 4,
            ChangeType::Initial => 7,
            ChangeType::NoMaterialChange => 10,
        };
        let rank = priority_rank(ct, Probability::new(p).unwrap(), conf);
        prop_assert!(rank >= base && rank <= base + 4);
    }

    #[test]
    fn alerts_are_capped_and_sorted(
        records in prop::collection::vec(change_record(), 0..30),
        max_alerts in 1usize..15,
    ) {
        let changes: Vec<ChangeRecord> = records.iter().map(|(c, _)| c.clone()).collect();
        let beliefs: Vec<BeliefConfidence> = records
            .iter()
            .filter_map(|(c, conf)| conf.map(|confidence| BeliefConfidence { entity_id: c.entity_id.clone(), confidence }))
            .collect();

        let alerts = AlertBuilder::new(AlertConfig { max_alerts }).build(&changes, &beliefs);

        prop_assert!(alerts.len() <= max_alerts);
        prop_assert_eq!(alerts.len(), changes.len().min(max_alerts));
        prop_assert!(alerts.windows(2).all(|w| w[0].priority_rank <= w[1].priority_rank));
    }

    #[test]
    fn every_alert_yields_two_or_three_suggestions(records in prop::collection::vec(change_record(), 1..20)) {
        let changes: Vec<ChangeRecord> = records.into_iter().map(|(c, _)| c).collect();
        let alerts = AlertBuilder::new(AlertConfig { max_alerts: changes.len() }).build(&changes, &[]);
        let builder = SuggestionBuilder::new();

        let mut total = 0;
        for alert in &alerts {
            let suggestions = builder.for_alert(alert);
            prop_assert!((2..=3).contains(&suggestions.len()));
            prop_assert!(suggestions.iter().all(|s| s.entity_id == alert.entity_id));
            total += suggestions.len();
        }
        prop_assert_eq!(builder.build(&alerts).len(), total);
    }
}

#[test]
fn default_cap_is_ten() {
    assert_eq!(AlertConfig::default().max_alerts, 10);
}
