#[rocket::launch]
fn rocket() -> _ {
    let rocket = content_import::rocket();
    log::info!("starting content import server");
    rocket
}
