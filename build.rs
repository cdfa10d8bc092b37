use std::env;
use std::fs::File;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if env::var_os("CARGO_FEATURE_OPENGL").is_none() {
        return;
    }

    #[cfg(feature = "opengl")]
    {
        use gl_generator::{Api, Fallbacks, Profile, Registry};

        let out_dir = env::var("OUT_DIR").unwrap();
        let dest = Path::new(&out_dir).join("gl_bindings.rs");
        let mut file = File::create(dest).unwrap();

        Registry::new(Api::Gl, (4, 6), Profile::Core, Fallbacks::All, [])
            .write_bindings(gl_generator::GlobalGenerator, &mut file)
            .unwrap();
    }
}
