//! Session commands.

use wearables_storefront::Storefront;

use super::CliError;

/// Ask the backend who is signed in; a signed-in user's cart is merged and
/// synced.
///
/// # Errors
///
/// Returns an error if the session lookup or the login merge fails.
pub async fn whoami(storefront: &Storefront) -> Result<(), CliError> {
    let user = storefront.session().resolve_current_user().await?;

    #[allow(clippy::print_stdout)]
    {
        match user {
            Some(user) => println!("Signed in as {} (#{})", user.email, user.id),
            None => println!("Not signed in"),
        }
    }
    super::cart::show(storefront);
    Ok(())
}

/// Sign out. The cart returns to an empty guest cart.
pub async fn logout(storefront: &Storefront) {
    storefront.session().logout().await;

    #[allow(clippy::print_stdout)]
    {
        println!("Signed out");
    }
}
