//! Prints the status of all devices belonging to the owner of a device.
//!
//! ```bash
//! cargo run --example list-devices -- my_api_key my_api_secret my_device_id
//! ```

use std::env::args;

fn main() -> tuyaapi::Result<()> {
    let mut args = args().skip(1);
    let api_key = args.next().expect("Expected api key as first argument");
    let api_secret = args.next().expect("Expected api secret as second argument");
    let device_id = args.next().expect("Expected a device id as third argument");

    let requestor = tuyaapi::Requestor::new(api_key, api_secret)?;
    let uid = requestor.device_uid(&device_id)?;

    for device in requestor.user_devices(&uid)? {
        println!("{}", device);
    }
    Ok(())
}
