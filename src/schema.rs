diesel::table! {
    projects (id) {
        id -> Integer,
        consultation_category -> Text,
        project_title -> Text,
        consultation_content -> Text,
        research_category -> Nullable<Text>,
        deadline -> Nullable<Date>,
        customer_id -> Nullable<Integer>,
    }
}

diesel::table! {
    researchers (id) {
        id -> Integer,
        researcher_name -> Text,
        name_kana -> Nullable<Text>,
        institution -> Nullable<Text>,
        affiliation -> Nullable<Text>,
        position -> Nullable<Text>,
        kaken_url -> Nullable<Text>,
    }
}

diesel::table! {
    research_documents (id) {
        id -> Integer,
        researcher_id -> Integer,
        research_content -> Text,
        embedding -> Nullable<Binary>,
    }
}

diesel::table! {
    matches (id) {
        id -> Integer,
        project_id -> Integer,
        researcher_id -> Integer,
        matching_score -> Integer,
        request -> Bool,
        offer_status -> Bool,
        response -> Bool,
        resolution -> Bool,
        recruitment -> Bool,
        created_at -> Timestamp,
    }
}

diesel::joinable!(matches -> projects (project_id));
diesel::joinable!(matches -> researchers (researcher_id));
diesel::joinable!(research_documents -> researchers (researcher_id));

diesel::allow_tables_to_appear_in_same_query!(projects, researchers, research_documents, matches);
