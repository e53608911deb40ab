// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod medium_removal;
pub mod security_protocol;
pub mod start_stop;
pub mod test_unit_ready;
