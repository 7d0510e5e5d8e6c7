use crate::engine::mesh::{Mesh, FLOATS_PER_VERTEX};
use crate::engine::models::ModelLibrary;
use crate::engine::scene::{NodeShape, SceneGraph, Style, Transform};
use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext, WebGlUniformLocation};

type Gl = WebGlRenderingContext;

const VERTEX_SHADER: &str = r#"
    attribute vec3 aPosition;
    attribute vec3 aColor;
    uniform mat4 uModel;
    uniform mat4 uViewProjection;
    varying vec3 vColor;
    varying vec3 vWorld;
    void main() {
        vec4 world = uModel * vec4(aPosition, 1.0);
        vWorld = world.xyz;
        vColor = aColor;
        gl_Position = uViewProjection * world;
    }
"#;

const FRAGMENT_SHADER: &str = r#"
    precision mediump float;
    varying vec3 vColor;
    varying vec3 vWorld;
    uniform vec3 uColor;
    uniform bool uGrid;
    uniform float uScroll;
    uniform float uGridCell;
    uniform vec3 uGridColor;
    uniform vec3 uFogColor;

    void main() {
        // Vertex color carries per-face shading, the node supplies the hue.
        vec3 color = uColor * vColor;

        if (uGrid) {
            vec2 cell = fract(vec2(vWorld.x / uGridCell, vWorld.z / uGridCell - uScroll));
            float line = step(cell.x, 0.05) + step(cell.y, 0.05);
            color = mix(color, uGridColor, clamp(line, 0.0, 1.0));
        }

        // Fade into the horizon
        float fog = smoothstep(40.0, 110.0, length(vWorld.xz));
        color = mix(color, uFogColor, fog);

        gl_FragColor = vec4(color, 1.0);
    }
"#;

const FIELD_OF_VIEW: f32 = 75.0;
const GROUND_SIZE: f32 = 200.0;
const ROAD_WIDTH: f32 = 15.95;
const GRID_CELL: f32 = 4.0;

/// Colors and camera for one frame.
pub struct Frame {
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    /// Grid scroll offset in cells.
    pub scroll: f32,
    pub sky: (f32, f32, f32),
    pub terrain: (f32, f32, f32),
    pub terrain_grid: (f32, f32, f32),
    pub road: (f32, f32, f32),
    pub road_grid: (f32, f32, f32),
}

struct GpuMesh {
    vertices: WebGlBuffer,
    indices: WebGlBuffer,
    index_count: i32,
    lines: WebGlBuffer,
    line_vertex_count: i32,
}

struct Uniforms {
    model: WebGlUniformLocation,
    view_projection: WebGlUniformLocation,
    color: WebGlUniformLocation,
    grid: WebGlUniformLocation,
    scroll: WebGlUniformLocation,
    grid_cell: WebGlUniformLocation,
    grid_color: WebGlUniformLocation,
    fog_color: WebGlUniformLocation,
}

pub struct Renderer {
    pub gl: Gl,
    uniforms: Uniforms,
    position_attrib: u32,
    color_attrib: u32,
    unit_cube: GpuMesh,
    meshes: HashMap<String, GpuMesh>,
}

impl Renderer {
    pub fn new(gl: Gl) -> Result<Self, JsValue> {
        let program = create_program(&gl)?;
        gl.use_program(Some(&program));

        let uniform = |name: &str| {
            gl.get_uniform_location(&program, name)
                .ok_or_else(|| JsValue::from_str(&format!("Failed to get {} location", name)))
        };
        let uniforms = Uniforms {
            model: uniform("uModel")?,
            view_projection: uniform("uViewProjection")?,
            color: uniform("uColor")?,
            grid: uniform("uGrid")?,
            scroll: uniform("uScroll")?,
            grid_cell: uniform("uGridCell")?,
            grid_color: uniform("uGridColor")?,
            fog_color: uniform("uFogColor")?,
        };

        let position_attrib = gl.get_attrib_location(&program, "aPosition") as u32;
        let color_attrib = gl.get_attrib_location(&program, "aColor") as u32;

        // White unit cube, scaled per draw for obstacles and ground slabs.
        let unit_cube = upload(&gl, &Mesh::cube(1.0, 1.0, 1.0, 1.0))?;

        gl.uniform1f(Some(&uniforms.grid_cell), GRID_CELL);

        Ok(Renderer {
            gl,
            uniforms,
            position_attrib,
            color_attrib,
            unit_cube,
            meshes: HashMap::new(),
        })
    }

    pub fn clear(&self, (r, g, b): (f32, f32, f32)) {
        self.gl.clear_color(r, g, b, 1.0);
        self.gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
    }

    pub fn enable_depth_test(&self) {
        self.gl.enable(Gl::DEPTH_TEST);
    }

    pub fn resize(&self, width: i32, height: i32) {
        self.gl.viewport(0, 0, width, height);
    }

    pub fn canvas(&self) -> Option<HtmlCanvasElement> {
        self.gl.canvas().and_then(|c| c.dyn_into::<HtmlCanvasElement>().ok())
    }

    /// Draws ground, road and every visible node of the scene.
    pub fn draw_scene(&mut self, scene: &SceneGraph, models: &ModelLibrary, frame: &Frame) -> Result<(), JsValue> {
        let canvas = self.canvas().ok_or("No canvas")?;
        let (width, height) = (canvas.width(), canvas.height());
        self.resize(width as i32, height as i32);

        self.clear(frame.sky);
        self.enable_depth_test();

        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let projection = Perspective3::new(aspect, FIELD_OF_VIEW.to_radians(), 0.1, 1000.0).to_homogeneous();
        let view = Matrix4::look_at_rh(&Point3::from(frame.eye), &Point3::from(frame.target), &Vector3::y());
        let view_projection = projection * view;
        self.gl
            .uniform_matrix4fv_with_f32_array(Some(&self.uniforms.view_projection), false, view_projection.as_slice());
        let (r, g, b) = frame.sky;
        self.gl.uniform3f(Some(&self.uniforms.fog_color), r, g, b);
        self.gl.uniform1f(Some(&self.uniforms.scroll), frame.scroll);

        self.draw_ground(frame);

        for (_, node) in scene.nodes() {
            if !node.visible {
                continue;
            }
            match &node.shape {
                NodeShape::Cuboid { size } => {
                    let mut transform = node.transform;
                    transform.scale = transform.scale.component_mul(size);
                    self.draw_cube(&transform, node.color, false);
                }
                NodeShape::Model { key, style } => {
                    if !self.meshes.contains_key(key) {
                        let Some(model) = models.get_model(key) else {
                            continue;
                        };
                        let gpu = upload(&self.gl, &model.mesh)?;
                        self.meshes.insert(key.clone(), gpu);
                    }
                    if let Some(gpu) = self.meshes.get(key) {
                        match style {
                            Style::Solid => self.draw_triangles(gpu, &node.transform, node.color),
                            Style::Wireframe => self.draw_edges(gpu, &node.transform, node.color),
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn draw_ground(&self, frame: &Frame) {
        let (r, g, b) = frame.terrain_grid;
        self.gl.uniform3f(Some(&self.uniforms.grid_color), r, g, b);
        let mut terrain = Transform::at(0.0, -0.05, 0.0);
        terrain.scale = Vector3::new(GROUND_SIZE, 0.02, GROUND_SIZE);
        self.draw_cube(&terrain, frame.terrain, true);

        let (r, g, b) = frame.road_grid;
        self.gl.uniform3f(Some(&self.uniforms.grid_color), r, g, b);
        let mut road = Transform::at(0.0, 0.0, 0.0);
        road.scale = Vector3::new(ROAD_WIDTH, 0.02, GROUND_SIZE);
        self.draw_cube(&road, frame.road, true);
    }

    fn draw_cube(&self, transform: &Transform, color: (f32, f32, f32), grid: bool) {
        self.gl.uniform1i(Some(&self.uniforms.grid), grid as i32);
        self.draw_triangles(&self.unit_cube, transform, color);
        self.gl.uniform1i(Some(&self.uniforms.grid), 0);
    }

    fn draw_triangles(&self, gpu: &GpuMesh, transform: &Transform, (r, g, b): (f32, f32, f32)) {
        let stride = (FLOATS_PER_VERTEX * 4) as i32;
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&gpu.vertices));
        self.gl.bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(&gpu.indices));
        self.gl
            .vertex_attrib_pointer_with_i32(self.position_attrib, 3, Gl::FLOAT, false, stride, 0);
        self.gl.enable_vertex_attrib_array(self.position_attrib);
        self.gl
            .vertex_attrib_pointer_with_i32(self.color_attrib, 3, Gl::FLOAT, false, stride, 12);
        self.gl.enable_vertex_attrib_array(self.color_attrib);

        self.set_model(transform);
        self.gl.uniform3f(Some(&self.uniforms.color), r, g, b);
        self.gl
            .draw_elements_with_i32(Gl::TRIANGLES, gpu.index_count, Gl::UNSIGNED_SHORT, 0);
    }

    fn draw_edges(&self, gpu: &GpuMesh, transform: &Transform, (r, g, b): (f32, f32, f32)) {
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&gpu.lines));
        self.gl
            .vertex_attrib_pointer_with_i32(self.position_attrib, 3, Gl::FLOAT, false, 0, 0);
        self.gl.enable_vertex_attrib_array(self.position_attrib);
        self.gl.disable_vertex_attrib_array(self.color_attrib);
        self.gl.vertex_attrib3f(self.color_attrib, 1.0, 1.0, 1.0);

        self.set_model(transform);
        self.gl.uniform3f(Some(&self.uniforms.color), r, g, b);
        self.gl.draw_arrays(Gl::LINES, 0, gpu.line_vertex_count);
    }

    fn set_model(&self, transform: &Transform) {
        let model = model_matrix(transform);
        self.gl
            .uniform_matrix4fv_with_f32_array(Some(&self.uniforms.model), false, model.as_slice());
    }
}

fn model_matrix(t: &Transform) -> Matrix4<f32> {
    Matrix4::new_translation(&t.position)
        * Matrix4::from_euler_angles(t.rotation.x, t.rotation.y, t.rotation.z)
        * Matrix4::new_nonuniform_scaling(&t.scale)
}

fn upload(gl: &Gl, mesh: &Mesh) -> Result<GpuMesh, JsValue> {
    let vertices = gl.create_buffer().ok_or("Failed to create buffer")?;
    gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&vertices));
    unsafe {
        let array = js_sys::Float32Array::view(&mesh.vertices);
        gl.buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &array, Gl::STATIC_DRAW);
    }

    let indices = gl.create_buffer().ok_or("Failed to create buffer")?;
    gl.bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(&indices));
    unsafe {
        let array = js_sys::Uint16Array::view(&mesh.indices);
        gl.buffer_data_with_array_buffer_view(Gl::ELEMENT_ARRAY_BUFFER, &array, Gl::STATIC_DRAW);
    }

    let edge_lines = mesh.edge_lines();
    let lines = gl.create_buffer().ok_or("Failed to create buffer")?;
    gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&lines));
    unsafe {
        let array = js_sys::Float32Array::view(&edge_lines);
        gl.buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &array, Gl::STATIC_DRAW);
    }

    Ok(GpuMesh {
        vertices,
        indices,
        index_count: mesh.indices.len() as i32,
        lines,
        line_vertex_count: (edge_lines.len() / 3) as i32,
    })
}

fn create_program(gl: &Gl) -> Result<WebGlProgram, JsValue> {
    let vert_shader = compile_shader(gl, Gl::VERTEX_SHADER, VERTEX_SHADER)?;
    let frag_shader = compile_shader(gl, Gl::FRAGMENT_SHADER, FRAGMENT_SHADER)?;

    let program = gl.create_program().ok_or("Unable to create program")?;
    gl.attach_shader(&program, &vert_shader);
    gl.attach_shader(&program, &frag_shader);
    gl.link_program(&program);

    if gl.get_program_parameter(&program, Gl::LINK_STATUS).as_bool().unwrap_or(false) {
        Ok(program)
    } else {
        Err(JsValue::from_str(&gl.get_program_info_log(&program).unwrap_or_default()))
    }
}

fn compile_shader(gl: &Gl, shader_type: u32, source: &str) -> Result<web_sys::WebGlShader, JsValue> {
    let shader = gl.create_shader(shader_type).ok_or("Unable to create shader")?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl.get_shader_parameter(&shader, Gl::COMPILE_STATUS).as_bool().unwrap_or(false) {
        Ok(shader)
    } else {
        Err(JsValue::from_str(&gl.get_shader_info_log(&shader).unwrap_or_default()))
    }
}
