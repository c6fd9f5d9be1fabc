//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//!
//! Results cross the boundary as JSON strings. A failure returns `null`
//! to Kotlin and is written to logcat.

use jni::objects::{JClass, JString};
use jni::sys::{jdouble, jstring};
use jni::JNIEnv;

use crate::catalog::RouteRecord;
use crate::summary;

#[cfg(target_os = "android")]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RideMapCore"),
    );
}

#[cfg(not(target_os = "android"))]
fn init_logging() {}

/// Unwrap a JSON result, logging the failure.
fn json_or_log<E: std::fmt::Display>(context: &str, result: Result<String, E>) -> Option<String> {
    match result {
        Ok(json) => Some(json),
        Err(e) => {
            log::error!("{context}: {e}");
            None
        }
    }
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    let read = env.get_string(value).map(String::from);
    json_or_log("failed to read Java string", read)
}

fn into_jstring(env: &JNIEnv, json: Option<String>) -> jstring {
    let Some(json) = json else {
        return std::ptr::null_mut();
    };
    match env.new_string(json) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            log::error!("failed to create Java string: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Returns the core library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridemap_app_RustBridge_version(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    into_jstring(&env, Some(crate::VERSION.to_string()))
}

/// Parses a GPX document and returns its TrackSummary as JSON.
/// Maps to: RustBridge.summarizeGpx(gpx: String, tolerance: Double) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridemap_app_RustBridge_summarizeGpx(
    mut env: JNIEnv,
    _class: JClass,
    gpx: JString,
    tolerance: jdouble,
) -> jstring {
    init_logging();

    let json = read_string(&mut env, &gpx).and_then(|text| {
        let result = summary::summarize_gpx(&text, tolerance)
            .map_err(|e| e.to_string())
            .and_then(|s| s.to_json().map_err(|e| e.to_string()));
        json_or_log("failed to summarize GPX", result)
    });
    into_jstring(&env, json)
}

/// Builds a route record for one GPX file and returns it as JSON.
/// Maps to: RustBridge.routeRecord(fileName: String, gpx: String, tolerance: Double) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridemap_app_RustBridge_routeRecord(
    mut env: JNIEnv,
    _class: JClass,
    file_name: JString,
    gpx: JString,
    tolerance: jdouble,
) -> jstring {
    init_logging();

    let json = read_string(&mut env, &file_name)
        .zip(read_string(&mut env, &gpx))
        .and_then(|(file_name, text)| {
            let result = RouteRecord::from_gpx(&file_name, &text, tolerance)
                .map_err(|e| e.to_string())
                .and_then(|record| serde_json::to_string(&record).map_err(|e| e.to_string()));
            json_or_log(&format!("failed to build route record for {file_name}"), result)
        });
    into_jstring(&env, json)
}
