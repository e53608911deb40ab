// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// TEST UNIT READY(6) operation code.
pub const TEST_UNIT_READY: u8 = 0x00;

/// CDB length for TEST UNIT READY(6).
pub const TEST_UNIT_READY_CDB_LEN: usize = 6;

/// Build a standard TEST UNIT READY CDB; every field is zero.
#[inline]
pub fn build_test_unit_ready(cdb: &mut [u8; TEST_UNIT_READY_CDB_LEN]) {
    cdb.fill(0);
    cdb[0] = TEST_UNIT_READY;
}
