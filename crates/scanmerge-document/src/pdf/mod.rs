// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading, assembling, writing, page images, and overlays.

pub mod assemble;
pub mod images;
pub mod overlay;
pub mod reader;
pub mod writer;

pub use assemble::PageAssembler;
pub use reader::PdfReader;
