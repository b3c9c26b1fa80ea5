use super::*;
use diesel::upsert::excluded;

table! {
    evidence (id) {
        id -> BigInt,
        team -> Varchar,
        team_class -> Varchar,
        level -> Integer,
        points -> Double,
        link -> Varchar,
        note -> Nullable<Varchar>,
        validated -> Bool,
        correction_note -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

#[derive(Queryable)]
#[diesel(table_name = evidence)]
struct EvidencePrivate {
    id: i64,
    team: String,
    team_class: String,
    level: i32,
    points: f64,
    link: String,
    note: Option<String>,
    validated: bool,
    correction_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = evidence)]
struct EvidencePrivateNew {
    team: String,
    team_class: String,
    level: i32,
    points: f64,
    link: String,
    note: Option<String>,
    validated: bool,
    correction_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn private_to_public(p: EvidencePrivate) -> Result<EvidenceRecord, String> {
    use conversions::*;
    Ok(EvidenceRecord {
        id: i64_to_u64(p.id)?,
        team: p.team,
        team_class: string_to_team_class(p.team_class),
        level: p.level,
        points: p.points,
        link: p.link,
        note: p.note,
        validated: p.validated,
        correction_note: p.correction_note,
        created_at: p.created_at,
        updated_at: p.updated_at,
    })
}

fn build_new_row(new: NewEvidence) -> EvidencePrivateNew {
    use conversions::*;
    let now = Utc::now();
    EvidencePrivateNew {
        team: new.key.team,
        team_class: team_class_to_string(new.key.team_class),
        level: new.key.level,
        points: new.points,
        link: new.link,
        note: new.note,
        validated: false,
        correction_note: None,
        created_at: now,
        updated_at: now,
    }
}

/// Get every record, newest first.
pub fn get_all_evidence(conn: &mut PgConnection) -> Result<Vec<EvidenceRecord>, String> {
    use self::evidence::dsl::*;

    let items_private: Vec<EvidencePrivate> = evidence
        .order((created_at.desc(), id.desc()))
        .load(conn)
        .map_err(|err| err.to_string())?;

    items_private
        .into_iter()
        .map(private_to_public)
        .collect::<Result<Vec<EvidenceRecord>, String>>()
}

/// Insert a record for the natural key, or overwrite the existing one.
/// Runs as a single `INSERT .. ON CONFLICT DO UPDATE` so concurrent
/// submissions for one key can't create duplicates.
pub fn upsert_evidence(
    conn: &mut PgConnection,
    input: NewEvidence,
) -> Result<EvidenceRecord, String> {
    use self::evidence::dsl::*;

    let insert_row = build_new_row(input);

    diesel::insert_into(evidence)
        .values(&insert_row)
        .on_conflict((team, team_class, level))
        .do_update()
        .set((
            points.eq(excluded(points)),
            link.eq(excluded(link)),
            note.eq(excluded(note)),
            validated.eq(false),
            correction_note.eq(None::<String>),
            updated_at.eq(excluded(updated_at)),
        ))
        .get_result::<EvidencePrivate>(conn)
        .map_err(|err| err.to_string())
        .and_then(private_to_public)
}

pub fn update_evidence_validated(
    conn: &mut PgConnection,
    row_id: u64,
) -> Result<Option<EvidenceRecord>, String> {
    use self::evidence::dsl::*;

    // ids past the column's range can't match a row
    let Ok(row_id) = conversions::u64_to_i64(row_id) else {
        return Ok(None);
    };

    diesel::update(evidence.filter(id.eq(row_id)))
        .set((
            validated.eq(true),
            correction_note.eq(None::<String>),
            updated_at.eq(Utc::now()),
        ))
        .get_result::<EvidencePrivate>(conn)
        .optional()
        .map_err(|err| err.to_string())?
        .map(private_to_public)
        .transpose()
}

pub fn update_evidence_correction(
    conn: &mut PgConnection,
    row_id: u64,
    input_correction_note: Option<String>,
) -> Result<Option<EvidenceRecord>, String> {
    use self::evidence::dsl::*;

    // ids past the column's range can't match a row
    let Ok(row_id) = conversions::u64_to_i64(row_id) else {
        return Ok(None);
    };

    diesel::update(evidence.filter(id.eq(row_id)))
        .set((
            validated.eq(false),
            correction_note.eq(input_correction_note),
            updated_at.eq(Utc::now()),
        ))
        .get_result::<EvidencePrivate>(conn)
        .optional()
        .map_err(|err| err.to_string())?
        .map(private_to_public)
        .transpose()
}
