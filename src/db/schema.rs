// Kept in step with the DDL in provision.rs.

diesel::table! {
    records (id) {
        id -> Text,
        player_name -> Text,
        date -> Date,
        initial_points -> BigInt,
        final_points -> BigInt,
        add_ons -> Integer,
        point_balance -> BigInt,
        created_at -> Timestamp,
    }
}

diesel::table! {
    stats (player_name) {
        player_name -> Text,
        total_games -> BigInt,
        total_balance -> BigInt,
        average_balance -> Double,
        best_balance -> BigInt,
        worst_balance -> BigInt,
    }
}

diesel::table! {
    players (id) {
        id -> Text,
        name -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    settings (key) {
        key -> Text,
        value -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(players, records, settings, stats,);
