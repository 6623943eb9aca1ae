fn main() {
    // Embedded by sqlx::migrate!; rebuild when a migration is added or edited
    println!("cargo:rerun-if-changed=migrations");
}
