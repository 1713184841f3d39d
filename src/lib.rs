/*!
# Movielog

A single-user movie log, served as a web page and persisted to a Google
Sheets spreadsheet.

## Overview

Movielog puts a login gate, an add-movie form and a card list with inline
edit/delete in front of one spreadsheet tab. Every record is a row; the
header row carries the schema. The app holds no database of its own - the
sheet is the storage, shared with whatever else reads it (the sheet UI,
exports, other tools).

## Architecture

The application follows a client-server architecture:

### Frontend Layer
- **Technologies**: HTML, CSS, vanilla JavaScript (served as static pages)
- **Key Components**:
  - Login screen - password form, session cookie
  - Add form - title, poster URL, rating, tag picker, review
  - Card list - one card per record with an expandable inline editor

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Record Store - CRUD over movie rows, stable-key addressing
  - Sheets Client - Google Sheets v4 REST calls, service-account auth
  - Session Gate - Argon2 password check, in-memory sessions
  - Tag Vocabulary - base genres plus observed plus session scratch tags

### Storage Layer
- One spreadsheet tab with the header
  `title, poster_url, rating, tags, review, created_at, id`
- Row order is display order; row 1 is never data
- The `id` column holds generated keys so edits survive concurrent
  row shifts

## Key Features

- Password login with an externally configured Argon2 hash
- Add / edit / delete movie records with ratings, tags and reviews
- Tag vocabulary grown from the data plus per-session custom tags
- Key-based record addressing (no positional misfires)
- Connection diagnostics binary for first-time setup

## Modules

- **record**: the movie record model, rating and tag helpers
- **store**: record store adapter over a tabular backend
- **sheets**: Google Sheets v4 client (token, values, batch update)
- **auth**: password verification and session management
- **config**: environment configuration and the service-account key
- **error**: crate-wide error type and HTTP response mapping
- **app**: routing, handlers and shared state

## REST API Endpoints

- `GET /api/movies` - list all records
- `POST /api/movies` - append a record
- `PUT /api/movies/:id` - update rating/tags/review of a record
- `DELETE /api/movies/:id` - delete a record
- `GET /api/tags` / `POST /api/tags` - tag vocabulary and custom tags
- `POST /login`, `POST /logout` - session gate
*/

// Re-export all modules so they appear in the documentation
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod record;
pub mod sheets;
pub mod store;

/// Re-export the common types to make the crate easier to use
pub use error::{Error, Result};
pub use record::{MovieRecord, MovieUpdate, NewMovie};
pub use store::{MovieStore, SheetBackend, StoredRecord};
