/// Inline SQL migrations for the AgencyDesk schema.
///
/// One statement per entry; the position in the list is the version number
/// recorded in `_migrations`. Enumerated columns carry named CHECK
/// constraints so violations report the constraint name, not its SQL.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: profiles
    r#"
CREATE TABLE IF NOT EXISTS profiles (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    full_name   TEXT,
    avatar_url  TEXT,
    role        TEXT NOT NULL DEFAULT 'client'
        CONSTRAINT profiles_role_valid CHECK (role IN ('client', 'admin', 'staff', 'influencer')),
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);
"#,
    // Migration 2: clients
    r#"
CREATE TABLE IF NOT EXISTS clients (
    id              TEXT PRIMARY KEY,
    user_id         TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    name            TEXT NOT NULL,
    company         TEXT,
    email           TEXT,
    phone           TEXT,
    status          TEXT NOT NULL DEFAULT 'active'
        CONSTRAINT clients_status_valid CHECK (status IN ('active', 'paused', 'lead')),
    total_spent     REAL NOT NULL DEFAULT 0,
    account_manager TEXT,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_clients_user ON clients(user_id);"#,
    // Migration 3: projects
    r#"
CREATE TABLE IF NOT EXISTS projects (
    id          TEXT PRIMARY KEY,
    client_id   TEXT NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT,
    status      TEXT NOT NULL DEFAULT 'active'
        CONSTRAINT projects_status_valid CHECK (status IN ('active', 'completed', 'paused')),
    progress    INTEGER NOT NULL DEFAULT 0
        CONSTRAINT projects_progress_range CHECK (progress BETWEEN 0 AND 100),
    value       REAL NOT NULL DEFAULT 0,
    start_date  TEXT,
    end_date    TEXT,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_projects_client ON projects(client_id);"#,
    // Migration 4: tasks
    r#"
CREATE TABLE IF NOT EXISTS tasks (
    id          TEXT PRIMARY KEY,
    project_id  TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    description TEXT,
    status      TEXT NOT NULL DEFAULT 'todo'
        CONSTRAINT tasks_status_valid CHECK (status IN ('todo', 'in-progress', 'done')),
    priority    TEXT
        CONSTRAINT tasks_priority_valid CHECK (priority IS NULL OR priority IN ('low', 'medium', 'high')),
    assignee    TEXT,
    due_date    TEXT,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);"#,
    // Migration 5: invoices
    r#"
CREATE TABLE IF NOT EXISTS invoices (
    id             TEXT PRIMARY KEY,
    client_id      TEXT NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    project_id     TEXT REFERENCES projects(id) ON DELETE SET NULL,
    invoice_number TEXT,
    amount         REAL NOT NULL
        CONSTRAINT invoices_amount_non_negative CHECK (amount >= 0),
    status         TEXT NOT NULL DEFAULT 'pending'
        CONSTRAINT invoices_status_valid CHECK (status IN ('paid', 'pending', 'overdue')),
    issued_date    TEXT,
    due_date       TEXT,
    created_at     INTEGER NOT NULL,
    updated_at     INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_invoices_client ON invoices(client_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_invoices_status_due ON invoices(status, due_date);"#,
    // Migration 6: leads
    r#"
CREATE TABLE IF NOT EXISTS leads (
    id                  TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    company             TEXT,
    email               TEXT,
    phone               TEXT,
    source              TEXT,
    status              TEXT NOT NULL DEFAULT 'new'
        CONSTRAINT leads_status_valid CHECK (status IN ('new', 'contacted', 'qualified', 'closed')),
    notes               TEXT,
    estimated_value     REAL,
    converted_client_id TEXT REFERENCES clients(id) ON DELETE SET NULL,
    created_at          INTEGER NOT NULL,
    updated_at          INTEGER NOT NULL
);
"#,
    // Migration 7: approvals (client-facing assets)
    r#"
CREATE TABLE IF NOT EXISTS approvals (
    id            TEXT PRIMARY KEY,
    client_id     TEXT NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    project_id    TEXT REFERENCES projects(id) ON DELETE SET NULL,
    title         TEXT NOT NULL,
    description   TEXT,
    kind          TEXT NOT NULL DEFAULT 'other'
        CONSTRAINT approvals_kind_valid CHECK (kind IN ('image', 'video', 'document', 'copy', 'other')),
    file_url      TEXT,
    thumbnail_url TEXT,
    status        TEXT NOT NULL DEFAULT 'uploaded'
        CONSTRAINT approvals_status_valid CHECK (status IN ('pending', 'approved', 'rejected', 'uploaded')),
    comments      TEXT NOT NULL DEFAULT '[]',
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_approvals_project ON approvals(project_id, created_at DESC);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_approvals_client ON approvals(client_id, created_at DESC);"#,
    // Migration 8: reports
    r#"
CREATE TABLE IF NOT EXISTS reports (
    id          TEXT PRIMARY KEY,
    client_id   TEXT NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    period      TEXT,
    file_url    TEXT NOT NULL,
    created_at  INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_reports_client ON reports(client_id);"#,
    // Migration 9: messaging
    r#"
CREATE TABLE IF NOT EXISTS conversations (
    id          TEXT PRIMARY KEY,
    title       TEXT,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS conversation_participants (
    conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
    profile_id      TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    joined_at       INTEGER NOT NULL,
    last_read_at    INTEGER,
    last_read_seq   INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (conversation_id, profile_id)
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_participants_profile ON conversation_participants(profile_id);"#,
    // `seq` gives a total order inside a conversation even when several
    // messages share a `created_at` second; read markers point at it.
    r#"
CREATE TABLE IF NOT EXISTS messages (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    id              TEXT NOT NULL UNIQUE,
    conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
    sender_id       TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    content         TEXT NOT NULL DEFAULT '',
    attachments     TEXT NOT NULL DEFAULT '[]',
    created_at      INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, seq);"#,
    // Migration 10: blog (public marketing site)
    r#"
CREATE TABLE IF NOT EXISTS blog_categories (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    created_at  INTEGER NOT NULL
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS blog_tags (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    created_at  INTEGER NOT NULL
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS blog_posts (
    id              TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    slug            TEXT NOT NULL UNIQUE,
    excerpt         TEXT,
    content         TEXT NOT NULL DEFAULT '',
    cover_image_url TEXT,
    status          TEXT NOT NULL DEFAULT 'draft'
        CONSTRAINT blog_posts_status_valid CHECK (status IN ('draft', 'published')),
    author_id       TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    category_id     TEXT REFERENCES blog_categories(id) ON DELETE SET NULL,
    published_at    INTEGER,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_blog_posts_status ON blog_posts(status, published_at DESC);"#,
    r#"
CREATE TABLE IF NOT EXISTS blog_post_tags (
    post_id TEXT NOT NULL REFERENCES blog_posts(id) ON DELETE CASCADE,
    tag_id  TEXT NOT NULL REFERENCES blog_tags(id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, tag_id)
);
"#,
];
