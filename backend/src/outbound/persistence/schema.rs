//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate
//! with `diesel print-schema` after changing a migration.

diesel::table! {
    /// Accounts for every role, with optional academic profile columns.
    principals (id) {
        id -> Uuid,
        username -> Varchar,
        full_name -> Varchar,
        email -> Varchar,
        role -> Varchar,
        /// Encoded salted digest, never the password.
        password_digest -> Text,
        student_id -> Nullable<Uuid>,
        matric_number -> Nullable<Varchar>,
        lecturer_id -> Nullable<Uuid>,
        department -> Nullable<Varchar>,
        level -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Courses taught in a term.
    offerings (id) {
        id -> Uuid,
        code -> Varchar,
        title -> Varchar,
        credit_units -> Int4,
        department -> Varchar,
        session_start -> Int4,
        semester -> Varchar,
        lecturer_id -> Uuid,
        capacity -> Int4,
        enrolled_count -> Int4,
        prerequisites -> Array<Text>,
    }
}

diesel::table! {
    registrations (id) {
        id -> Uuid,
        student_id -> Uuid,
        offering_id -> Uuid,
        session_start -> Int4,
        semester -> Varchar,
        status -> Varchar,
        payment_waived -> Bool,
        rejection_reason -> Nullable<Text>,
        submitted_at -> Timestamptz,
        lecturer_decision_by -> Nullable<Uuid>,
        lecturer_decision_at -> Nullable<Timestamptz>,
        exam_officer_decision_by -> Nullable<Uuid>,
        exam_officer_decision_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Scores are stored in hundredths; the letter is derived at entry time.
    grade_records (id) {
        id -> Uuid,
        student_id -> Uuid,
        offering_id -> Uuid,
        course_code -> Varchar,
        credit_units -> Int4,
        session_start -> Int4,
        semester -> Varchar,
        ca_hundredths -> Int4,
        exam_hundredths -> Int4,
        letter -> Varchar,
        stage -> Varchar,
        rejection_reason -> Nullable<Text>,
        entered_by -> Uuid,
        entered_at -> Timestamptz,
        history -> Jsonb,
    }
}

diesel::table! {
    /// Amounts are in kobo.
    fee_structures (id) {
        id -> Uuid,
        name -> Varchar,
        department -> Varchar,
        level -> Int4,
        session_start -> Int4,
        semester -> Varchar,
        tuition_kobo -> Int8,
        library_kobo -> Int8,
        lab_kobo -> Int8,
        sports_kobo -> Int8,
        medical_kobo -> Int8,
        other_kobo -> Int8,
        total_kobo -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    invoices (id) {
        id -> Uuid,
        invoice_number -> Varchar,
        student_id -> Uuid,
        session_start -> Int4,
        semester -> Varchar,
        fee_structure_id -> Uuid,
        amount_due_kobo -> Int8,
        amount_paid_kobo -> Int8,
        issued_at -> Timestamptz,
    }
}

diesel::table! {
    payments (id) {
        id -> Uuid,
        reference -> Varchar,
        student_id -> Uuid,
        invoice_id -> Uuid,
        amount_kobo -> Int8,
        status -> Varchar,
        authorization_url -> Nullable<Text>,
        access_code -> Nullable<Text>,
        gateway_transaction_id -> Nullable<Text>,
        failure_reason -> Nullable<Text>,
        receipt_number -> Nullable<Varchar>,
        created_at -> Timestamptz,
        settled_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(registrations -> offerings (offering_id));
diesel::joinable!(grade_records -> offerings (offering_id));
diesel::joinable!(invoices -> fee_structures (fee_structure_id));
diesel::joinable!(payments -> invoices (invoice_id));

diesel::allow_tables_to_appear_in_same_query!(
    principals,
    offerings,
    registrations,
    grade_records,
    fee_structures,
    invoices,
    payments,
);
