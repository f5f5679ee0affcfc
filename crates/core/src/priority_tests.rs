// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ordering_is_high_then_normal_then_low() {
    assert!(Priority::High > Priority::Normal);
    assert!(Priority::Normal > Priority::Low);
}

#[test]
fn default_is_normal() {
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn from_str_round_trips() {
    assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
    assert_eq!("LOW".parse::<Priority>().unwrap(), Priority::Low);
    assert!("urgent".parse::<Priority>().is_err());
}

#[test]
fn display_matches_as_str() {
    assert_eq!(Priority::High.to_string(), Priority::High.as_str());
}
