// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use hdds_layer::Descriptor;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Walk the whole chain the way the registry does
    let mut remaining = Some(text);
    while let Some(current) = remaining {
        match Descriptor::parse(current) {
            Ok(head) => {
                let _ = head.args.get("mode");
                remaining = head.rest;
            }
            Err(_) => break,
        }
    }
});
