/*!
# Survey Explorer

A password-gated, browser-based explorer for the farmer welfare survey workbook.

## Overview

The survey records live in a single Excel workbook. Operators log in, narrow the
records down with a few filters, pick the optional columns they need and
download the result as a spreadsheet. The workbook is fetched once per process
and never modified; every interaction derives a fresh view from it.

## Architecture

### Core
- **cell**: `CellValue`, the scalar stored in every cell
- **dataset**: `Dataset` and `Workbook`, the read-only tables
- **recode**: value substitution applied right after load (priority codes to labels)
- **pipeline**: the filter-and-project pipeline producing a `View`
- **loader**: xlsx / csv parsing into a `Workbook`
- **downloader**: `View` export to xlsx / csv
- **config**: JSON configuration with environment overrides
- **error**: `ExplorerError`

### Web layer (`web` feature)
- **source**: lazily filled, read-only workbook cache keyed by source location
- **session**: per-operator session context holding the filter parameters
- **login**: password gate, session cookie and auth middleware
- **app**: routing, pages and the JSON API

## Filter rules

A record is kept when every active predicate holds:

- its value in the chosen column is one of the selected values,
- every selected support column is non-empty,
- its taluka is one of the selected talukas.

The view then carries the mandatory columns in their configured order,
followed by the selected optional columns in selection order.

## REST API Endpoints

- `/api/columns` - Column roles and searchable optional columns
- `/api/values` - Unique values of a column
- `/api/filters` - Read or replace the session's filter parameters
- `/api/view` - Current view plus auxiliary sheets
- `/api/export` - Download the view (xlsx or csv)
- `/api/refresh` - Reload the source workbook
*/

pub mod cell;
pub mod config;
pub mod dataset;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod recode;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod login;
#[cfg(feature = "web")]
pub mod session;
#[cfg(feature = "web")]
pub mod source;

pub use cell::CellValue;
pub use config::Config;
pub use dataset::{Dataset, Workbook};
pub use error::{ExplorerError, Result};
pub use pipeline::{ColumnRoles, FilterParams, UnknownColumnPolicy, View};
