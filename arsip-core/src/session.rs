use crate::{
    auth::Authenticator,
    cache::{LocalStoreHandle, AUTH_SLOT},
    error::Error,
};

const AUTHENTICATED: &[u8] = b"true";

/// Explicit authentication context.  Every board operation takes one, and
/// refuses to run until `login` succeeded.  A successful login is persisted
/// and survives restarts until `logout`.
pub struct Session {
    store: LocalStoreHandle,
    authenticated: bool,
}

impl Session {
    /// Pick up the flag left by an earlier login, if any.
    pub fn restore(store: LocalStoreHandle) -> Self {
        let authenticated = store.get(AUTH_SLOT).as_deref() == Some(AUTHENTICATED);
        Self {
            store,
            authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn ensure_authenticated(&self) -> Result<(), Error> {
        if self.authenticated {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    pub fn login(&mut self, auth: &dyn Authenticator, password: &str) -> Result<(), Error> {
        match auth.verify(password) {
            Ok(true) => {}
            Ok(false) => {
                log::info!("login rejected");
                return Err(Error::AuthError);
            }
            Err(err) => {
                log::error!("auth call failed: {}", err);
                return Err(Error::AuthError);
            }
        }
        self.store.set(AUTH_SLOT, AUTHENTICATED)?;
        self.authenticated = true;
        log::info!("logged in");
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), Error> {
        self.authenticated = false;
        self.store.remove(AUTH_SLOT)?;
        log::info!("logged out");
        Ok(())
    }
}
