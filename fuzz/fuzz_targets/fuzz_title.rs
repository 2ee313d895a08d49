// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use retitle::rename::{is_same_name, sanitize_title, FORBIDDEN_CHARS};

#[derive(Arbitrary, Debug)]
struct TitleInput<'a> {
    title: &'a str,
    current_name: &'a str,
    max_chars: u8,
}

fuzz_target!(|input: TitleInput| {
    let max_chars = usize::from(input.max_chars).max(1);
    let clean = sanitize_title(input.title, max_chars);

    assert!(clean.chars().count() <= max_chars);
    assert!(!clean.contains(&FORBIDDEN_CHARS[..]));

    let _ = is_same_name(&clean, input.current_name);
});
