/// Tables are created parents first; foreign keys point at already existing tables.
pub const SCHEMA_SQL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS log_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS extension_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS attribute_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS classifier_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS trace_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS event_collection_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS event_id_seq START 1;

CREATE TABLE IF NOT EXISTS log (
  id BIGINT PRIMARY KEY,
  name TEXT
);

CREATE TABLE IF NOT EXISTS extension (
  id BIGINT PRIMARY KEY,
  name TEXT,
  prefix TEXT,
  uri TEXT
);

CREATE TABLE IF NOT EXISTS attribute (
  id BIGINT PRIMARY KEY,
  "type" TEXT NOT NULL,
  "key" TEXT NOT NULL,
  ext_id BIGINT REFERENCES extension(id),
  parent_id BIGINT
);

CREATE TABLE IF NOT EXISTS trace (
  id BIGINT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS event_collection (
  id BIGINT PRIMARY KEY,
  name TEXT
);

CREATE TABLE IF NOT EXISTS event (
  id BIGINT PRIMARY KEY,
  event_coll_id BIGINT REFERENCES event_collection(id)
);

CREATE TABLE IF NOT EXISTS classifier (
  id BIGINT PRIMARY KEY,
  name TEXT,
  keys TEXT,
  log_id BIGINT NOT NULL REFERENCES log(id)
);

CREATE TABLE IF NOT EXISTS log_has_attribute (
  log_id BIGINT NOT NULL REFERENCES log(id),
  trace_global BOOLEAN NOT NULL,
  event_global BOOLEAN NOT NULL,
  attr_id BIGINT NOT NULL REFERENCES attribute(id),
  "value" TEXT NOT NULL,
  PRIMARY KEY (log_id, trace_global, event_global, attr_id)
);

CREATE TABLE IF NOT EXISTS log_has_trace (
  "sequence" BIGINT NOT NULL,
  log_id BIGINT NOT NULL REFERENCES log(id),
  trace_id BIGINT NOT NULL REFERENCES trace(id),
  PRIMARY KEY (log_id, "sequence")
);

CREATE TABLE IF NOT EXISTS trace_has_attribute (
  trace_id BIGINT NOT NULL REFERENCES trace(id),
  attr_id BIGINT NOT NULL REFERENCES attribute(id),
  "value" TEXT NOT NULL,
  PRIMARY KEY (trace_id, attr_id)
);

CREATE TABLE IF NOT EXISTS trace_has_event (
  "sequence" BIGINT NOT NULL,
  trace_id BIGINT NOT NULL REFERENCES trace(id),
  event_id BIGINT NOT NULL REFERENCES event(id),
  PRIMARY KEY (trace_id, "sequence")
);

CREATE TABLE IF NOT EXISTS event_has_attribute (
  event_id BIGINT NOT NULL REFERENCES event(id),
  attr_id BIGINT NOT NULL REFERENCES attribute(id),
  "value" TEXT NOT NULL,
  PRIMARY KEY (event_id, attr_id)
);

CREATE INDEX IF NOT EXISTS idx_trace_has_event_event ON trace_has_event(event_id);
CREATE INDEX IF NOT EXISTS idx_event_has_attribute_attr ON event_has_attribute(attr_id);
"#;

/// Children first, so no foreign key is left dangling while dropping.
pub const DROP_SQL: &str = r#"
DROP TABLE IF EXISTS event_has_attribute;
DROP TABLE IF EXISTS trace_has_event;
DROP TABLE IF EXISTS event;
DROP TABLE IF EXISTS event_collection;
DROP TABLE IF EXISTS trace_has_attribute;
DROP TABLE IF EXISTS log_has_trace;
DROP TABLE IF EXISTS trace;
DROP TABLE IF EXISTS log_has_attribute;
DROP TABLE IF EXISTS classifier;
DROP TABLE IF EXISTS log;
DROP TABLE IF EXISTS attribute;
DROP TABLE IF EXISTS extension;

DROP SEQUENCE IF EXISTS log_id_seq;
DROP SEQUENCE IF EXISTS extension_id_seq;
DROP SEQUENCE IF EXISTS attribute_id_seq;
DROP SEQUENCE IF EXISTS classifier_id_seq;
DROP SEQUENCE IF EXISTS trace_id_seq;
DROP SEQUENCE IF EXISTS event_collection_id_seq;
DROP SEQUENCE IF EXISTS event_id_seq;
"#;
