use anyhow::anyhow;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Connectivity represents the "connected" state of a mocked driven port and provides
/// common behavior for returning an error if the port is configured to be in a disconnected state.
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Return an error if connectivity is in a "disconnected" state
    pub fn blow_up_if_disconnected(&self) -> Result<(), anyhow::Error> {
        match self {
            Self::Connected => Ok(()),
            Self::Disconnected => Err(anyhow!("could not reach the backend!")),
        }
    }
}

/// Deterministic user ID for tests, so assertions can name users by number
pub fn user_id(number: u128) -> Uuid {
    Uuid::from_u128(0x1000 + number)
}

/// Deterministic timestamp `minutes` after a fixed point in time
pub fn minutes_after_epoch(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// FakeImplementation is a quick drop-in property that helps mock a function and capture
/// arguments the function is called with. Mock services put one of these behind a [std::sync::Mutex]
/// per trait method, since the traits are async and mocking libraries handle that poorly.
///
/// * [Args] represents the arguments passed to the function that should be captured on a call
/// * [Ret] represents the type of the function's return value
///
/// # Example
///
/// ```ignore
/// struct MockProfileService {
///     get_profile_result: FakeImplementation<Uuid, Result<Option<Profile>, ProfileError>>,
/// }
///
/// impl ProfilePort for Mutex<MockProfileService> {
///     async fn get_profile(&self, user_id: Uuid, /* ... */) -> Result<Option<Profile>, ProfileError> {
///         let mut locked_self = self.lock().unwrap();
///         locked_self.get_profile_result.save_arguments(user_id);
///         locked_self.get_profile_result.return_value_result()
///     }
/// }
/// ```
pub struct FakeImplementation<Args, Ret> {
    saved_arguments: Vec<Args>,
    return_value: Option<Ret>,
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    pub fn new() -> FakeImplementation<Args, Ret> {
        FakeImplementation {
            saved_arguments: Vec::new(),
            return_value: None,
        }
    }

    /// Saves arguments from a single invocation of the FakeImplementation
    pub fn save_arguments(&mut self, arguments: Args) {
        self.saved_arguments.push(arguments)
    }

    /// Returns the list of arguments passed on every call to this FakeImplementation
    pub fn calls(&self) -> &[Args] {
        self.saved_arguments.as_slice()
    }
}

impl<Args, Success, Fail> FakeImplementation<Args, Result<Success, Fail>>
where
    Success: Clone,
    Fail: Clone,
{
    /// Set the result that should be returned when this FakeImplementation is invoked
    pub fn set_returned_result(&mut self, return_value: Result<Success, Fail>) {
        self.return_value = Some(return_value);
    }

    /// Retrieve the configured result. Panics if a test forgot to configure one.
    pub fn return_value_result(&self) -> Result<Success, Fail> {
        match self.return_value {
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(err.clone()),
            None => panic!("Tried to return from a function where the return value wasn't set!"),
        }
    }
}
