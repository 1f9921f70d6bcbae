table! {
    merchants (id) {
        id -> VarChar,
        legal_name -> VarChar,
        contact_email -> VarChar,
        country -> VarChar,
        monthly_volume -> Numeric,
        status -> VarChar,
        psp_provider -> Nullable<VarChar>,
        psp_validated -> Bool,
        psp_last_verified_at -> Nullable<Timestamp>,
        rejection_reason -> Nullable<VarChar>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        deleted_at -> Nullable<Timestamp>,
    }
}

table! {
    merchant_documents (id) {
        id -> Uuid,
        merchant_id -> VarChar,
        document_type -> VarChar,
        blob_ref -> VarChar,
        uploaded_at -> Timestamp,
    }
}

table! {
    agents (id) {
        id -> VarChar,
        external_subject -> VarChar,
        display_name -> VarChar,
        contact_email -> VarChar,
        is_active -> Bool,
        created_at -> Timestamp,
    }
}

table! {
    api_keys (id) {
        id -> VarChar,
        tenant_id -> VarChar,
        key_hash -> VarChar,
        key_prefix -> VarChar,
        created_at -> Timestamp,
        revoked_at -> Nullable<Timestamp>,
        last_used_at -> Nullable<Timestamp>,
    }
}

table! {
    usage_records (id) {
        id -> Int8,
        tenant_id -> VarChar,
        endpoint -> VarChar,
        outcome -> VarChar,
        error_kind -> Nullable<VarChar>,
        latency_ms -> Int4,
        created_at -> Timestamp,
    }
}

table! {
    user_roles (id) {
        id -> Uuid,
        user_id -> Integer,
        name -> VarChar,
        data -> Nullable<Jsonb>,
    }
}

joinable!(merchant_documents -> merchants (merchant_id));
allow_tables_to_appear_in_same_query!(merchants, merchant_documents);
