//! SQL schema for the Vellum SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS content (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    content_type_id    INTEGER NOT NULL,
    section_id         INTEGER NOT NULL,
    owner_id           INTEGER NOT NULL,
    current_version_no INTEGER NOT NULL,
    -- Highest version number ever allocated; never decreases.
    last_version_no    INTEGER NOT NULL DEFAULT 0,
    name               TEXT    NOT NULL,
    always_available   INTEGER NOT NULL DEFAULT 0,
    remote_id          TEXT    NOT NULL UNIQUE,
    main_language_code TEXT    NOT NULL,
    main_location_id   INTEGER,
    modification_date  TEXT    NOT NULL,   -- RFC 3339 UTC
    publication_date   TEXT
);

CREATE TABLE IF NOT EXISTS content_versions (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    content_id            INTEGER NOT NULL REFERENCES content(id),
    version_no            INTEGER NOT NULL,
    status                TEXT    NOT NULL,   -- 'draft' | 'published' | 'archived'
    creator_id            INTEGER NOT NULL,
    creation_date         TEXT    NOT NULL,
    modification_date     TEXT    NOT NULL,
    initial_language_code TEXT    NOT NULL,
    language_codes        TEXT    NOT NULL DEFAULT '[]',   -- JSON array
    always_available      INTEGER NOT NULL DEFAULT 0,
    UNIQUE (content_id, version_no)
);

-- Names reference the content only; they outlive version rows until the
-- version's own names are deleted.
CREATE TABLE IF NOT EXISTS content_names (
    content_id    INTEGER NOT NULL REFERENCES content(id),
    version_no    INTEGER NOT NULL,
    language_code TEXT    NOT NULL,
    name          TEXT    NOT NULL,
    PRIMARY KEY (content_id, version_no, language_code)
);

CREATE TABLE IF NOT EXISTS content_fields (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    content_id          INTEGER NOT NULL,
    version_no          INTEGER NOT NULL,
    field_definition_id INTEGER NOT NULL,
    field_type          TEXT    NOT NULL,
    language_code       TEXT    NOT NULL,
    data_json           TEXT    NOT NULL,
    sort_key            TEXT,
    FOREIGN KEY (content_id, version_no)
      REFERENCES content_versions(content_id, version_no),
    UNIQUE (content_id, version_no, field_definition_id, language_code)
);

-- Out-of-row field payloads.
CREATE TABLE IF NOT EXISTS external_field_data (
    field_id     INTEGER PRIMARY KEY REFERENCES content_fields(id),
    payload_json TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS content_relations (
    id                         INTEGER PRIMARY KEY AUTOINCREMENT,
    source_content_id          INTEGER NOT NULL,
    source_version_no          INTEGER NOT NULL,
    source_field_definition_id INTEGER,
    destination_content_id     INTEGER NOT NULL REFERENCES content(id),
    relation_type              TEXT    NOT NULL,
    FOREIGN KEY (source_content_id, source_version_no)
      REFERENCES content_versions(content_id, version_no)
);

CREATE TABLE IF NOT EXISTS locations (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id        INTEGER REFERENCES locations(id),
    content_id       INTEGER,
    path_string      TEXT    NOT NULL,
    depth            INTEGER NOT NULL,
    priority         INTEGER NOT NULL DEFAULT 0,
    hidden           INTEGER NOT NULL DEFAULT 0,
    invisible        INTEGER NOT NULL DEFAULT 0,
    remote_id        TEXT    NOT NULL UNIQUE,
    main_location_id INTEGER
);

INSERT OR IGNORE INTO locations (id, parent_id, content_id, path_string, depth, remote_id)
VALUES (1, NULL, NULL, '/1/', 0, 'root');

CREATE TABLE IF NOT EXISTS node_assignments (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    content_id         INTEGER NOT NULL,
    version_no         INTEGER NOT NULL,
    parent_location_id INTEGER NOT NULL,
    op_code            TEXT    NOT NULL,   -- pending operation, e.g. 'create'
    location_id        INTEGER,            -- set once materialised
    priority           INTEGER NOT NULL DEFAULT 0,
    hidden             INTEGER NOT NULL DEFAULT 0,
    remote_id          TEXT,
    FOREIGN KEY (content_id, version_no)
      REFERENCES content_versions(content_id, version_no)
);

CREATE INDEX IF NOT EXISTS versions_creator_idx    ON content_versions(creator_id, status);
CREATE INDEX IF NOT EXISTS fields_version_idx      ON content_fields(content_id, version_no);
CREATE INDEX IF NOT EXISTS relations_source_idx    ON content_relations(source_content_id, source_version_no);
CREATE INDEX IF NOT EXISTS relations_dest_idx      ON content_relations(destination_content_id);
CREATE INDEX IF NOT EXISTS locations_content_idx   ON locations(content_id);
CREATE INDEX IF NOT EXISTS locations_path_idx      ON locations(path_string);
CREATE INDEX IF NOT EXISTS assignments_version_idx ON node_assignments(content_id, version_no);

PRAGMA user_version = 1;
";
